use std::collections::HashMap;

use bevy::math::Vec3;

use super::common::{DeliveryTarget, Direction, GridPosition};

/// Fraction of a cell between a building center and its delivery triggers.
pub const SIDE_OFFSET: f32 = 0.35;

/// Resolves the trigger hosted on a building side.
pub trait TriggerLookup {
    type Trigger;

    fn trigger(&self, target: &DeliveryTarget) -> Option<Self::Trigger>;
}

/// Maps grid cells to world coordinates. The world is transposed with
/// respect to the grid: world x runs along grid y.
#[derive(Debug, Clone, Copy)]
pub struct GridLayout {
    pub size: i32,
    pub cell_size: f32,
}

impl GridLayout {
    pub fn new(size: i32, cell_size: f32) -> Self {
        Self { size, cell_size }
    }

    pub fn world_position(&self, position: GridPosition) -> Vec3 {
        let half = (self.size / 2) as f32;
        Vec3::new(position.y as f32, position.x as f32, 0.) * self.cell_size
            - Vec3::new(half, half, 0.) * self.cell_size
    }

    pub fn side_world_position(&self, position: GridPosition, side: Direction) -> Vec3 {
        let (dx, dy) = side.unit_vector();
        self.world_position(position)
            + Vec3::new(dy as f32, dx as f32, 0.) * self.cell_size * SIDE_OFFSET
    }

    /// Cell whose center is closest to `world`; may lie outside the grid.
    pub fn grid_position(&self, world: Vec3) -> GridPosition {
        let half = (self.size / 2) as f32;
        GridPosition::new(
            (world.y / self.cell_size + half).round() as i32,
            (world.x / self.cell_size + half).round() as i32,
        )
    }

    pub fn cells(&self) -> impl Iterator<Item = GridPosition> {
        let size = self.size;
        (0..size).flat_map(move |y| (0..size).map(move |x| GridPosition::new(x, y)))
    }

    /// Ring of barriers around the city with the yaw, in degrees, they face.
    pub fn barriers(&self) -> Vec<(GridPosition, f32)> {
        let size = self.size;
        let mut barriers = vec![];

        for y in -1..=size {
            for x in [-1, size] {
                barriers.push((GridPosition::new(x, y), if x == -1 { 180. } else { 0. }));
            }
        }
        for x in 0..size {
            for y in [-1, size] {
                barriers.push((GridPosition::new(x, y), if y == -1 { 90. } else { -90. }));
            }
        }

        barriers
    }
}

/// Which building occupies which cell and which trigger sits on which side,
/// filled once when the city is spawned.
#[derive(Debug)]
pub struct Registry<B, T> {
    buildings: HashMap<GridPosition, B>,
    triggers: HashMap<DeliveryTarget, T>,
}

impl<B, T> Default for Registry<B, T> {
    fn default() -> Self {
        Self {
            buildings: HashMap::new(),
            triggers: HashMap::new(),
        }
    }
}

impl<B: Copy, T: Copy> Registry<B, T> {
    pub fn insert_building(&mut self, position: GridPosition, building: B) {
        self.buildings.insert(position, building);
    }

    pub fn insert_trigger(&mut self, target: DeliveryTarget, trigger: T) {
        self.triggers.insert(target, trigger);
    }

    pub fn building(&self, position: &GridPosition) -> Option<B> {
        self.buildings.get(position).copied()
    }
}

impl<B: Copy, T: Copy> TriggerLookup for Registry<B, T> {
    type Trigger = T;

    fn trigger(&self, target: &DeliveryTarget) -> Option<T> {
        self.building(&target.position)?;
        self.triggers.get(target).copied()
    }
}
