use thiserror::Error;
use tracing::{debug, info};

use super::common::{Direction, GridPosition, PlayerNavState, Route};

/// Draws allowed for a single step before the whole walk starts over.
pub const MAX_STEP_DRAWS: usize = 100;
/// Walks attempted by one generation before giving up.
pub const MAX_WALKS: usize = 100;
/// Shortest route ever handed to the player.
pub const MIN_ROUTE_LENGTH: usize = 2;

// A route never doubles back on itself.
const RELATIVE_MOVES: [Direction; 3] = [Direction::Forward, Direction::Left, Direction::Right];

/// `(facing, relative move, edge)` triples that would walk off the grid when
/// the current cell touches `edge`.
const BOUNDARY_TABLE: [(Direction, Direction, Direction); 16] = {
    use Direction::*;
    [
        (Left, Forward, Left),
        (Right, Back, Left),
        (Forward, Left, Left),
        (Back, Right, Left),
        (Forward, Back, Back),
        (Back, Forward, Back),
        (Right, Right, Back),
        (Left, Left, Back),
        (Right, Forward, Right),
        (Left, Back, Right),
        (Forward, Right, Right),
        (Back, Left, Right),
        (Forward, Forward, Forward),
        (Back, Back, Forward),
        (Right, Left, Forward),
        (Left, Right, Forward),
    ]
};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RouteError {
    #[error("No acceptable walk found after {walks} attempts")]
    Exhausted { walks: usize },
    #[error("No walk of {steps} moves leads away from {from}")]
    NoRoute { from: GridPosition, steps: usize },
}

/// An accepted walk: the moves to show and the state they lead to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Walk {
    pub route: Route,
    pub end: PlayerNavState,
}

/// Number of moves for the next route. Short rounds ask for longer routes.
pub fn route_length(previous_round_duration: f32, budget: f32) -> usize {
    let steps = (budget - previous_round_duration) as i32 / 3;
    steps.max(MIN_ROUTE_LENGTH as i32) as usize
}

/// Whether the boundary table forbids `relative` from `state`.
pub fn leaves_grid(state: &PlayerNavState, relative: Direction, size: i32) -> bool {
    state
        .position
        .touched_edges(size)
        .any(|edge| BOUNDARY_TABLE.contains(&(state.facing, relative, edge)))
}

/// Offset applied to the building position when turning a corner, keyed on
/// the facing and side before the turn.
fn corner_offset(facing: Direction, side: Direction, turn: Direction) -> (i32, i32) {
    use Direction::*;
    match (turn, facing, side) {
        (Left, Forward, Right) => (0, 0),
        (Left, Forward, _) => (-1, 0),
        (Left, Back, Right) => (1, -1),
        (Left, Back, _) => (0, -1),
        (Left, Left, Forward) => (-1, 0),
        (Left, Left, _) => (-1, -1),
        (Left, Right, Forward) => (0, 1),
        (Left, Right, _) => (0, 0),
        (Right, Forward, Right) => (1, 0),
        (Right, Forward, _) => (0, 0),
        (Right, Back, Right) => (0, -1),
        (Right, Back, _) => (-1, -1),
        (Right, Left, Forward) => (-1, 1),
        (Right, Left, _) => (-1, 0),
        (Right, Right, Forward) => (0, 0),
        (Right, Right, _) => (0, -1),
        (Forward | Back, _, _) => (0, 0),
    }
}

/// Applies one relative move without any bounds handling.
pub fn transition(state: &PlayerNavState, relative: Direction) -> PlayerNavState {
    let (dx, dy) = state.facing.unit_vector();
    match relative {
        Direction::Forward => {
            PlayerNavState::new(state.facing, state.side, state.position.offset((dx, dy)))
        }
        Direction::Back => PlayerNavState::new(
            state.facing.opposite(),
            state.side,
            state.position.offset((-dx, -dy)),
        ),
        Direction::Left | Direction::Right => {
            let facing = state.facing.heading(relative);
            let side = if facing.is_longitudinal() {
                Direction::Right
            } else {
                Direction::Forward
            };
            let offset = corner_offset(state.facing, state.side, relative);
            PlayerNavState::new(facing, side, state.position.offset(offset))
        }
    }
}

/// Pulls a candidate that stepped onto the outer street back onto the grid,
/// delivering on the outward face of the boundary building.
pub fn clamp_to_boundary(mut candidate: PlayerNavState) -> Option<PlayerNavState> {
    let position = candidate.position;
    if position.x == -1 && position.y == -1 {
        return None;
    }

    if position.x == -1 {
        candidate.position.x = 0;
        candidate.side = Direction::Left;
    } else if position.y == -1 {
        candidate.position.y = 0;
        candidate.side = Direction::Back;
    }

    Some(candidate)
}

#[derive(Debug, Clone, Copy)]
pub struct RouteGenerator {
    grid_size: i32,
    max_walks: usize,
}

impl RouteGenerator {
    pub fn new(grid_size: i32) -> Self {
        Self {
            grid_size,
            max_walks: MAX_WALKS,
        }
    }

    /// Same generator giving up after `max_walks` random walks.
    pub fn with_max_walks(self, max_walks: usize) -> Self {
        Self { max_walks, ..self }
    }

    pub fn grid_size(&self) -> i32 {
        self.grid_size
    }

    /// The state reached by `relative`, or `None` if the move is rejected.
    pub fn step(&self, state: &PlayerNavState, relative: Direction) -> Option<PlayerNavState> {
        if leaves_grid(state, relative, self.grid_size) {
            return None;
        }

        let candidate = clamp_to_boundary(transition(state, relative))?;
        if !candidate.position.is_inside(self.grid_size) {
            return None;
        }

        Some(candidate)
    }

    /// Random walk of `steps` moves from `start` ending on another building.
    pub fn generate(
        &self,
        start: PlayerNavState,
        steps: usize,
        rng: &fastrand::Rng,
    ) -> Result<Walk, RouteError> {
        info!(
            "generating {} moves from {} facing {} on side {}",
            steps, start.position, start.facing, start.side
        );

        for attempt in 0..self.max_walks {
            match self.walk(start, steps, rng, attempt) {
                Some(walk) if walk.end.position != start.position => {
                    info!(
                        "route {:?} leads to {} on side {}",
                        walk.route.moves, walk.end.position, walk.end.side
                    );
                    return Ok(walk);
                }
                Some(_) => debug!(attempt, "walk came back to the start, starting over"),
                None => debug!(attempt, "walk ran out of draws, starting over"),
            }
        }

        Err(RouteError::Exhausted {
            walks: self.max_walks,
        })
    }

    /// Depth first search over every walk of `steps` moves, trying moves in
    /// a fixed order. Finds a walk whenever one exists.
    pub fn search(&self, start: PlayerNavState, steps: usize) -> Result<Walk, RouteError> {
        let mut moves = Vec::with_capacity(steps);
        match self.search_from(start, start.position, steps, &mut moves) {
            Some(end) => Ok(Walk {
                route: Route { moves },
                end,
            }),
            None => Err(RouteError::NoRoute {
                from: start.position,
                steps,
            }),
        }
    }

    fn walk(
        &self,
        start: PlayerNavState,
        steps: usize,
        rng: &fastrand::Rng,
        attempt: usize,
    ) -> Option<Walk> {
        let mut state = start;
        let mut moves = Vec::with_capacity(steps);
        let mut draws = 0;

        while moves.len() < steps {
            if draws >= MAX_STEP_DRAWS {
                return None;
            }
            draws += 1;

            let relative = RELATIVE_MOVES[rng.usize(0..RELATIVE_MOVES.len())];
            let next = match self.step(&state, relative) {
                Some(next) => next,
                None => continue,
            };

            debug!(
                attempt,
                "turn {} -> facing {} side {} at {}",
                relative,
                next.facing,
                next.side,
                next.position
            );

            state = next;
            moves.push(relative);
            draws = 0;
        }

        Some(Walk {
            route: Route { moves },
            end: state,
        })
    }

    fn search_from(
        &self,
        state: PlayerNavState,
        origin: GridPosition,
        steps: usize,
        moves: &mut Vec<Direction>,
    ) -> Option<PlayerNavState> {
        if moves.len() == steps {
            return (state.position != origin).then_some(state);
        }

        for relative in RELATIVE_MOVES {
            let next = match self.step(&state, relative) {
                Some(next) => next,
                None => continue,
            };

            moves.push(relative);
            if let Some(end) = self.search_from(next, origin, steps, moves) {
                return Some(end);
            }
            moves.pop();
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use crate::delivery::common::{Direction, GridPosition, PlayerNavState};

    use super::{
        clamp_to_boundary, leaves_grid, route_length, transition, RouteError, RouteGenerator,
        BOUNDARY_TABLE,
    };

    const SIZE: i32 = 6;

    fn all_states() -> Vec<PlayerNavState> {
        let mut states = vec![];
        for y in 0..SIZE {
            for x in 0..SIZE {
                for facing in Direction::ALL {
                    for side in Direction::ALL {
                        states.push(PlayerNavState::new(facing, side, GridPosition::new(x, y)));
                    }
                }
            }
        }
        states
    }

    #[test]
    fn test_boundary_table_blocks_heading_into_the_edge() {
        for facing in Direction::ALL {
            for relative in Direction::ALL {
                for edge in Direction::ALL {
                    let blocked = BOUNDARY_TABLE.contains(&(facing, relative, edge));
                    assert_eq!(
                        blocked,
                        facing.heading(relative) == edge,
                        "facing {} move {} edge {}",
                        facing,
                        relative,
                        edge
                    );
                }
            }
        }
    }

    #[test]
    fn test_forward_rejected_on_left_edge_facing_left() {
        let state = PlayerNavState::new(Direction::Left, Direction::Forward, GridPosition::new(0, 3));
        assert!(leaves_grid(&state, Direction::Forward, SIZE));
        assert!(!leaves_grid(&state, Direction::Right, SIZE));

        let generator = RouteGenerator::new(SIZE);
        assert_eq!(generator.step(&state, Direction::Forward), None);

        for seed in 0..200 {
            let rng = fastrand::Rng::with_seed(seed);
            let walk = generator.generate(state, 2, &rng).unwrap();
            assert_ne!(walk.route.moves[0], Direction::Forward);
        }
    }

    #[test]
    fn test_transitions() {
        let state = PlayerNavState::new(Direction::Forward, Direction::Right, GridPosition::new(3, 3));

        let forward = transition(&state, Direction::Forward);
        assert_eq!(
            forward,
            PlayerNavState::new(Direction::Forward, Direction::Right, GridPosition::new(3, 4))
        );

        let back = transition(&state, Direction::Back);
        assert_eq!(
            back,
            PlayerNavState::new(Direction::Back, Direction::Right, GridPosition::new(3, 2))
        );

        let right = transition(&state, Direction::Right);
        assert_eq!(
            right,
            PlayerNavState::new(Direction::Right, Direction::Forward, GridPosition::new(4, 3))
        );

        let left = transition(&state, Direction::Left);
        assert_eq!(
            left,
            PlayerNavState::new(Direction::Left, Direction::Forward, GridPosition::new(3, 3))
        );

        let state = PlayerNavState::new(Direction::Left, Direction::Back, GridPosition::new(3, 3));
        let left = transition(&state, Direction::Left);
        assert_eq!(
            left,
            PlayerNavState::new(Direction::Back, Direction::Right, GridPosition::new(2, 2))
        );
    }

    #[test]
    fn test_turns_face_the_expected_side() {
        for state in all_states() {
            for turn in [Direction::Left, Direction::Right] {
                let next = transition(&state, turn);
                assert_eq!(next.facing, state.facing.heading(turn));
                let expected_side = if next.facing.is_longitudinal() {
                    Direction::Right
                } else {
                    Direction::Forward
                };
                assert_eq!(next.side, expected_side);
                assert!((next.position.x - state.position.x).abs() <= 1);
                assert!((next.position.y - state.position.y).abs() <= 1);
            }
        }
    }

    #[test]
    fn test_clamp_forces_boundary_side() {
        let generator = RouteGenerator::new(SIZE);

        let state = PlayerNavState::new(Direction::Left, Direction::Forward, GridPosition::new(0, 2));
        let next = generator.step(&state, Direction::Right).unwrap();
        assert_eq!(
            next,
            PlayerNavState::new(Direction::Forward, Direction::Left, GridPosition::new(0, 3))
        );

        let state = PlayerNavState::new(Direction::Back, Direction::Right, GridPosition::new(2, 0));
        let next = generator.step(&state, Direction::Left).unwrap();
        assert_eq!(
            next,
            PlayerNavState::new(Direction::Right, Direction::Back, GridPosition::new(3, 0))
        );

        let corner = PlayerNavState::new(Direction::Back, Direction::Back, GridPosition::new(-1, -1));
        assert_eq!(clamp_to_boundary(corner), None);
    }

    #[test]
    fn test_route_length() {
        assert_eq!(route_length(25.0, 30.0), 2);
        assert_eq!(route_length(24.0, 30.0), 2);
        assert_eq!(route_length(21.0, 30.0), 3);
        assert_eq!(route_length(12.0, 30.0), 6);
        assert_eq!(route_length(40.0, 30.0), 2);
    }

    #[test]
    fn test_generated_routes_stay_on_grid() {
        let generator = RouteGenerator::new(SIZE);

        for (i, start) in all_states().into_iter().enumerate() {
            for steps in 2..=6 {
                let rng = fastrand::Rng::with_seed(i as u64 * 31 + steps as u64);
                let walk = generator.generate(start, steps, &rng).unwrap();

                assert_eq!(walk.route.len(), steps);
                assert!(!walk.route.moves.contains(&Direction::Back));
                assert!(walk.end.position.is_inside(SIZE));
                assert_ne!(walk.end.position, start.position);
            }
        }
    }

    #[test]
    fn test_generation_replays_with_same_seed() {
        let generator = RouteGenerator::new(SIZE);
        let start = PlayerNavState::new(Direction::Forward, Direction::Right, GridPosition::new(3, 3));

        let first = generator.generate(start, 5, &fastrand::Rng::with_seed(42));
        let second = generator.generate(start, 5, &fastrand::Rng::with_seed(42));
        assert_eq!(first, second);
    }

    #[test]
    fn test_search_finds_a_route_from_every_state() {
        let generator = RouteGenerator::new(SIZE);

        for start in all_states() {
            let walk = generator.search(start, 3).unwrap();
            assert_eq!(walk.route.len(), 3);
            assert_ne!(walk.end.position, start.position);
            assert!(walk.end.position.is_inside(SIZE));

            // Replaying the moves lands on the same building.
            let end = walk
                .route
                .moves
                .iter()
                .try_fold(start, |state, relative| generator.step(&state, *relative))
                .unwrap();
            assert_eq!(end, walk.end);
        }

        let center = PlayerNavState::new(Direction::Forward, Direction::Right, GridPosition::new(3, 3));
        assert!(generator.search(center, 6).is_ok());
    }

    #[test]
    fn test_generation_gives_up_after_max_walks() {
        let generator = RouteGenerator::new(SIZE).with_max_walks(0);
        let start = PlayerNavState::new(Direction::Forward, Direction::Right, GridPosition::new(3, 3));

        let result = generator.generate(start, 3, &fastrand::Rng::with_seed(1));
        assert_eq!(result, Err(RouteError::Exhausted { walks: 0 }));
    }

    #[test]
    fn test_single_cell_grid_has_no_route() {
        // Every move from the only building leaves the grid.
        let generator = RouteGenerator::new(1);
        let start = PlayerNavState::new(Direction::Forward, Direction::Right, GridPosition::new(0, 0));

        for relative in Direction::ALL {
            assert_eq!(generator.step(&start, relative), None);
        }
        assert_eq!(
            generator.generate(start, 2, &fastrand::Rng::with_seed(3)),
            Err(RouteError::Exhausted { walks: 100 })
        );
        assert_eq!(
            generator.search(start, 2),
            Err(RouteError::NoRoute {
                from: GridPosition::new(0, 0),
                steps: 2
            })
        );
    }
}
