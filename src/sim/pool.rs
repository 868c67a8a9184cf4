//! Fixed-capacity projectile pool
//!
//! Slots are allocated once and toggled active/inactive. Acquisition scans
//! slots in index order and claims the first inactive one, so a slot freed
//! by lifetime expiry or collision is rediscovered without a free list.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::events::{CommandOp, Entity, Outbox, PoolKind, ProjectileHandle};
use super::state::Facing;
use crate::consts::*;
use crate::error::SimError;
use crate::ticks_for;

/// A pooled projectile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Projectile {
    pub pos: Vec2,
    pub facing: Facing,
    pub active: bool,
    /// Ticks until automatic deactivation; cleared on early release
    pub ttl_ticks: u32,
}

impl Projectile {
    fn idle() -> Self {
        Self {
            pos: Vec2::ZERO,
            facing: Facing::Right,
            active: false,
            ttl_ticks: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectilePool {
    kind: PoolKind,
    slots: Vec<Projectile>,
    lifetime_ticks: u32,
    speed: f32,
}

impl ProjectilePool {
    pub fn new(kind: PoolKind, capacity: usize) -> Self {
        Self {
            kind,
            slots: (0..capacity).map(|_| Projectile::idle()).collect(),
            lifetime_ticks: ticks_for(PROJECTILE_LIFETIME),
            speed: PROJECTILE_SPEED,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn active_count(&self) -> usize {
        self.slots.iter().filter(|p| p.active).count()
    }

    pub fn get(&self, handle: ProjectileHandle) -> Option<&Projectile> {
        if handle.pool != self.kind {
            return None;
        }
        self.slots.get(handle.slot)
    }

    /// Fire the first inactive projectile from `origin` toward `facing`
    pub fn acquire(
        &mut self,
        origin: Vec2,
        facing: Facing,
        out: &mut Outbox,
    ) -> Result<ProjectileHandle, SimError> {
        let Some(slot) = self.slots.iter().position(|p| !p.active) else {
            return Err(SimError::PoolExhausted {
                capacity: self.slots.len(),
            });
        };

        let projectile = &mut self.slots[slot];
        projectile.pos = origin;
        projectile.facing = facing;
        projectile.active = true;
        projectile.ttl_ticks = self.lifetime_ticks;

        let handle = ProjectileHandle {
            pool: self.kind,
            slot,
        };
        let target = Entity::Projectile(handle);
        out.emit(target, CommandOp::SetPosition(origin));
        out.emit(target, CommandOp::SpriteFlip(facing == Facing::Left));
        out.emit(target, CommandOp::SetActive(true));
        Ok(handle)
    }

    /// Deactivate a projectile early (it hit something). Returns whether it was in flight.
    pub fn release(&mut self, handle: ProjectileHandle, out: &mut Outbox) -> bool {
        if handle.pool != self.kind {
            return false;
        }
        match self.slots.get_mut(handle.slot) {
            Some(projectile) if projectile.active => {
                projectile.active = false;
                projectile.ttl_ticks = 0;
                out.emit(Entity::Projectile(handle), CommandOp::SetActive(false));
                true
            }
            _ => false,
        }
    }

    /// Advance projectiles in flight and expire the ones whose lifetime ran out
    pub fn tick(&mut self, dt: f32, out: &mut Outbox) {
        let kind = self.kind;
        for (slot, projectile) in self.slots.iter_mut().enumerate() {
            if !projectile.active {
                continue;
            }
            let target = Entity::Projectile(ProjectileHandle { pool: kind, slot });

            projectile.ttl_ticks = projectile.ttl_ticks.saturating_sub(1);
            if projectile.ttl_ticks == 0 {
                projectile.active = false;
                out.emit(target, CommandOp::SetActive(false));
                continue;
            }

            projectile.pos.x += projectile.facing.sign() * self.speed * dt;
            out.emit(target, CommandOp::SetPosition(projectile.pos));
        }
    }

    /// Shift every projectile in flight (projectiles parented to the level)
    pub fn shift(&mut self, delta: Vec2) {
        for projectile in self.slots.iter_mut().filter(|p| p.active) {
            projectile.pos += delta;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_acquire_scans_in_index_order() {
        let mut pool = ProjectilePool::new(PoolKind::Player, 3);
        let mut out = Outbox::default();
        let a = pool.acquire(Vec2::ZERO, Facing::Right, &mut out).unwrap();
        let b = pool.acquire(Vec2::ZERO, Facing::Left, &mut out).unwrap();
        assert_eq!((a.slot, b.slot), (0, 1));

        assert!(pool.release(a, &mut out));
        let c = pool.acquire(Vec2::new(1.0, 2.0), Facing::Left, &mut out).unwrap();
        assert_eq!(c.slot, 0);
        assert_eq!(pool.get(c).unwrap().pos, Vec2::new(1.0, 2.0));
        assert_eq!(pool.get(c).unwrap().facing, Facing::Left);
    }

    #[test]
    fn test_exhausted_pool_drops_request() {
        let mut pool = ProjectilePool::new(PoolKind::Npc, 3);
        let mut out = Outbox::default();
        for _ in 0..3 {
            pool.acquire(Vec2::ZERO, Facing::Right, &mut out).unwrap();
        }
        let err = pool.acquire(Vec2::ZERO, Facing::Right, &mut out).unwrap_err();
        assert!(matches!(err, SimError::PoolExhausted { capacity: 3 }));
        assert_eq!(pool.capacity(), 3);
        assert_eq!(pool.active_count(), 3);
    }

    #[test]
    fn test_lifetime_returns_slot_to_pool() {
        let mut pool = ProjectilePool::new(PoolKind::Npc, 1);
        let mut out = Outbox::default();
        pool.acquire(Vec2::ZERO, Facing::Right, &mut out).unwrap();
        assert!(pool.acquire(Vec2::ZERO, Facing::Right, &mut out).is_err());

        for _ in 0..ticks_for(PROJECTILE_LIFETIME) {
            pool.tick(SIM_DT, &mut out);
        }
        assert_eq!(pool.active_count(), 0);
        assert!(pool.acquire(Vec2::ZERO, Facing::Right, &mut out).is_ok());
    }

    #[test]
    fn test_projectile_travels_in_facing_direction() {
        let mut pool = ProjectilePool::new(PoolKind::Player, 2);
        let mut out = Outbox::default();
        let left = pool.acquire(Vec2::ZERO, Facing::Left, &mut out).unwrap();
        let right = pool.acquire(Vec2::ZERO, Facing::Right, &mut out).unwrap();
        pool.tick(SIM_DT, &mut out);
        assert!(pool.get(left).unwrap().pos.x < 0.0);
        assert!(pool.get(right).unwrap().pos.x > 0.0);
    }

    #[test]
    fn test_release_of_idle_or_foreign_handle_is_ignored() {
        let mut pool = ProjectilePool::new(PoolKind::Player, 2);
        let mut out = Outbox::default();
        let foreign = ProjectileHandle {
            pool: PoolKind::Npc,
            slot: 0,
        };
        assert!(!pool.release(foreign, &mut out));
        let idle = ProjectileHandle {
            pool: PoolKind::Player,
            slot: 1,
        };
        assert!(!pool.release(idle, &mut out));
        assert!(out.commands.is_empty());
    }

    proptest! {
        #[test]
        fn prop_pool_never_grows(capacity in 1usize..24, requests in 0usize..64) {
            let mut pool = ProjectilePool::new(PoolKind::Player, capacity);
            let mut out = Outbox::default();
            let granted = (0..requests)
                .filter(|_| pool.acquire(Vec2::ZERO, Facing::Right, &mut out).is_ok())
                .count();
            prop_assert_eq!(granted, requests.min(capacity));
            prop_assert_eq!(pool.capacity(), capacity);
        }
    }
}
