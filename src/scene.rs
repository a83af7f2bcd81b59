//! The assembled holiday scene.
//!
//! A [`Scene`] owns every animated thing in a `hecs` world: the five tree
//! groups, the snow and the star. It holds the one [`AnimationState`] and
//! hands it to each animator per frame. It knows nothing about the GPU; the
//! renderer asks it for batches once with [`Scene::bind_slots`] and for fresh
//! instance data every frame with [`Scene::drain_uploads`].

use glam::Vec3;
use hecs::{Entity, World};
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::animation::generators::{Shell, TreeLayout, TreeShape};
use crate::animation::{AnimationState, GroupSpec, InstanceGroup, Motion, SnowField, TopMarker};
use crate::config::SceneConfig;
use crate::ecs::{Appearance, BatchId, MarkerAppearance, MarkerSlots, MeshKind, RenderSlot};
use crate::material::{Material, palette};
use crate::mesh::InstanceRaw;

/// Debug label carried by every scene entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Name(pub &'static str);

/// The tree, the snow and the star, plus the state that drives them.
pub struct Scene {
    world: World,
    rng: StdRng,
    state: AnimationState,
    origin: Vec3,
}

impl Scene {
    pub fn new(config: &SceneConfig) -> Self {
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let mut world = World::new();

        let tree = &config.tree;
        let explosion = &config.explosion;
        let origin = tree.origin;
        let shape = TreeShape::new(tree.height, tree.base_radius);
        let shell = Shell::new(explosion.inner_radius, explosion.outer_radius);
        let motion = Motion {
            rate: explosion.rate,
            spin_rate: explosion.spin_rate,
        };

        let light_leaves = tree.leaf_count / 2;
        let cubes = tree.ornament_count / 2;
        let surface = TreeLayout::Surface {
            offset: tree.ornament_offset.clone(),
        };
        let groups = [
            (
                "light leaves",
                light_leaves,
                TreeLayout::Volume,
                0.25,
                MeshKind::Octahedron,
                palette::leaf_light(),
            ),
            (
                "dark leaves",
                tree.leaf_count - light_leaves,
                TreeLayout::Volume,
                0.25,
                MeshKind::Octahedron,
                palette::leaf_dark(),
            ),
            (
                "cube ornaments",
                cubes,
                surface.clone(),
                0.3,
                MeshKind::Cube,
                palette::glass_ornament(),
            ),
            (
                "glass ornaments",
                tree.ornament_count - cubes,
                surface,
                0.25,
                MeshKind::Icosahedron,
                palette::glass_ornament(),
            ),
            (
                "ribbon",
                tree.ribbon_count,
                TreeLayout::Spiral {
                    loops: tree.ribbon_loops,
                    radius_offset: tree.ribbon_radius_offset,
                },
                0.08,
                MeshKind::Tetrahedron,
                palette::ribbon(),
            ),
        ];

        for (name, count, layout, scale_factor, mesh, material) in groups {
            let spec = GroupSpec {
                count,
                layout,
                scale_factor,
            };
            let group = InstanceGroup::generate(
                &spec,
                &shape,
                &shell,
                &explosion.scale_jitter,
                motion,
                &mut rng,
            )
            .with_origin(origin);
            world.spawn((Name(name), group, Appearance::new(mesh, material)));
        }

        let snow = SnowField::generate(&config.snow, &mut rng);
        world.spawn((
            Name("snow"),
            snow,
            Appearance::new(MeshKind::Snowflake, palette::snow()),
        ));

        let marker = TopMarker::new(&config.star, &mut rng).with_origin(origin);
        let looks = MarkerAppearance {
            star: Appearance::new(MeshKind::Star, palette::star()),
            core: Appearance::new(MeshKind::Core, palette::star_core()),
            sparkles: config
                .star
                .sparkles
                .iter()
                .map(|s| Appearance::new(MeshKind::Sparkle, palette::sparkle(s.color, s.opacity)))
                .collect(),
        };
        world.spawn((Name("star"), marker, looks));

        log::info!(
            "scene built: {} entities, {} instances",
            world.len(),
            Self::count_instances(&world)
        );

        Self {
            world,
            rng,
            state: AnimationState::default(),
            origin,
        }
    }

    pub fn state(&self) -> AnimationState {
        self.state
    }

    /// Flips between the assembled tree and the burst cloud.
    pub fn toggle(&mut self) -> AnimationState {
        let state = self.state.toggle();
        log::info!("animation state -> {state:?}");
        state
    }

    /// Where the tree stands in the world.
    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    /// Read-only access to the underlying ECS world.
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Total particle instances across every entity.
    pub fn instance_count(&self) -> usize {
        Self::count_instances(&self.world)
    }

    fn count_instances(world: &World) -> usize {
        let groups: usize = world
            .query::<&InstanceGroup>()
            .iter()
            .map(|(_, g)| g.count())
            .sum();
        let snow: usize = world
            .query::<&SnowField>()
            .iter()
            .map(|(_, s)| s.count())
            .sum();
        let marker: usize = world
            .query::<&TopMarker>()
            .iter()
            .map(|(_, m)| 2 + m.sparkles().iter().map(|s| s.count()).sum::<usize>())
            .sum();
        groups + snow + marker
    }

    /// Advances every animator by one frame.
    pub fn update(&mut self, dt: f32, time: f32) {
        let state = self.state;
        for (_, group) in self.world.query_mut::<&mut InstanceGroup>() {
            group.advance(dt, time, state);
        }
        for (_, snow) in self.world.query_mut::<&mut SnowField>() {
            snow.advance(dt, time, &mut self.rng);
        }
        for (_, marker) in self.world.query_mut::<&mut TopMarker>() {
            marker.advance(dt, time, state);
        }
    }

    /// Asks `bind` for one instance batch per drawable and remembers the answer.
    ///
    /// `bind` receives the shape, the material and the number of instances the
    /// batch must hold. Entities bound before are skipped.
    pub fn bind_slots<F>(&mut self, mut bind: F)
    where
        F: FnMut(MeshKind, &Material, usize) -> BatchId,
    {
        let mut slots: Vec<(Entity, RenderSlot)> = Vec::new();
        for (entity, (looks, group)) in self
            .world
            .query::<(&Appearance, &InstanceGroup)>()
            .without::<&RenderSlot>()
            .iter()
        {
            let id = bind(looks.mesh, &looks.material, group.count());
            slots.push((entity, RenderSlot(id)));
        }
        for (entity, (looks, snow)) in self
            .world
            .query::<(&Appearance, &SnowField)>()
            .without::<&RenderSlot>()
            .iter()
        {
            let id = bind(looks.mesh, &looks.material, snow.count());
            slots.push((entity, RenderSlot(id)));
        }

        let mut marker_slots: Vec<(Entity, MarkerSlots)> = Vec::new();
        for (entity, (looks, marker)) in self
            .world
            .query::<(&MarkerAppearance, &TopMarker)>()
            .without::<&MarkerSlots>()
            .iter()
        {
            let star = bind(looks.star.mesh, &looks.star.material, 1);
            let core = bind(looks.core.mesh, &looks.core.material, 1);
            let sparkles = looks
                .sparkles
                .iter()
                .zip(marker.sparkles())
                .map(|(looks, emitter)| bind(looks.mesh, &looks.material, emitter.count()))
                .collect();
            marker_slots.push((
                entity,
                MarkerSlots {
                    star,
                    core,
                    sparkles,
                },
            ));
        }

        for (entity, slot) in slots {
            if let Err(e) = self.world.insert_one(entity, slot) {
                log::warn!("could not bind render slot: {e}");
            }
        }
        for (entity, slots) in marker_slots {
            if let Err(e) = self.world.insert_one(entity, slots) {
                log::warn!("could not bind marker slots: {e}");
            }
        }
    }

    /// Hands every changed transform buffer to `upload`, once per change.
    pub fn drain_uploads<F>(&mut self, mut upload: F)
    where
        F: FnMut(BatchId, &[InstanceRaw]),
    {
        for (_, (group, slot)) in self.world.query_mut::<(&mut InstanceGroup, &RenderSlot)>() {
            if group.transforms_mut().take_dirty() {
                upload(slot.0, group.transforms().as_slice());
            }
        }
        for (_, (snow, slot)) in self.world.query_mut::<(&mut SnowField, &RenderSlot)>() {
            if snow.transforms_mut().take_dirty() {
                upload(slot.0, snow.transforms().as_slice());
            }
        }
        for (_, (marker, slots)) in self.world.query_mut::<(&mut TopMarker, &MarkerSlots)>() {
            if marker.star_transforms_mut().take_dirty() {
                upload(slots.star, marker.star_transforms().as_slice());
            }
            if marker.core_transforms_mut().take_dirty() {
                upload(slots.core, marker.core_transforms().as_slice());
            }
            for (emitter, &id) in marker.sparkles_mut().iter_mut().zip(&slots.sparkles) {
                if emitter.transforms_mut().take_dirty() {
                    upload(id, emitter.transforms().as_slice());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SnowConfig, StarConfig, TreeConfig};
    use std::collections::HashMap;

    fn small_config() -> SceneConfig {
        SceneConfig::new()
            .seed(42)
            .tree(TreeConfig::default().counts(40, 10, 12))
            .snow(SnowConfig {
                count: 25,
                ..SnowConfig::default()
            })
    }

    /// Binds every drawable to a fresh id and records the requested capacities.
    fn bind_all(scene: &mut Scene) -> HashMap<BatchId, (MeshKind, usize)> {
        let mut batches = HashMap::new();
        scene.bind_slots(|mesh, _material, capacity| {
            let id = BatchId(batches.len());
            batches.insert(id, (mesh, capacity));
            id
        });
        batches
    }

    #[test]
    fn builds_every_group() {
        let scene = Scene::new(&small_config());
        // Five tree groups, snow and the star
        assert_eq!(scene.world().len(), 7);
        let sparkles: usize = StarConfig::default().sparkles.iter().map(|s| s.count).sum();
        assert_eq!(scene.instance_count(), 40 + 10 + 12 + 25 + 2 + sparkles);
        assert_eq!(scene.state(), AnimationState::Tree);
        assert_eq!(scene.origin(), Vec3::new(0.0, -8.0, 0.0));
    }

    #[test]
    fn odd_counts_are_not_lost() {
        let config = small_config().tree(TreeConfig::default().counts(41, 11, 3));
        let scene = Scene::new(&config);
        let total: usize = scene
            .world()
            .query::<&InstanceGroup>()
            .iter()
            .map(|(_, g)| g.count())
            .sum();
        assert_eq!(total, 41 + 11 + 3);
    }

    #[test]
    fn binding_asks_once_per_drawable() {
        let mut scene = Scene::new(&small_config());
        let batches = bind_all(&mut scene);
        // Five groups, snow, star, core and two sparkle clouds
        assert_eq!(batches.len(), 10);
        let capacity: usize = batches.values().map(|(_, c)| c).sum();
        assert_eq!(capacity, scene.instance_count());
        assert!(batches.values().any(|&(mesh, c)| mesh == MeshKind::Snowflake && c == 25));
        assert!(batches.values().any(|&(mesh, c)| mesh == MeshKind::Star && c == 1));

        // Already bound entities are left alone
        let again = bind_all(&mut scene);
        assert!(again.is_empty());
    }

    #[test]
    fn uploads_follow_updates() {
        let mut scene = Scene::new(&small_config());
        let batches = bind_all(&mut scene);

        scene.update(1.0 / 60.0, 0.5);
        let mut uploaded = HashMap::new();
        scene.drain_uploads(|id, instances| {
            uploaded.insert(id, instances.len());
        });
        assert_eq!(uploaded.len(), batches.len());
        for (id, len) in &uploaded {
            assert_eq!(*len, batches[id].1);
        }

        // Nothing changed since the last drain
        let mut count = 0;
        scene.drain_uploads(|_, _| count += 1);
        assert_eq!(count, 0);
    }

    #[test]
    fn toggle_flips_state_both_ways() {
        let mut scene = Scene::new(&small_config());
        assert_eq!(scene.toggle(), AnimationState::Explode);
        assert_eq!(scene.state(), AnimationState::Explode);
        assert_eq!(scene.toggle(), AnimationState::Tree);
    }

    #[test]
    fn seeded_scenes_match() {
        let mut a = Scene::new(&small_config());
        let mut b = Scene::new(&small_config());
        a.update(0.1, 1.0);
        b.update(0.1, 1.0);
        let first = |scene: &Scene| {
            scene
                .world()
                .query::<&InstanceGroup>()
                .iter()
                .map(|(_, g)| g.current().to_vec())
                .collect::<Vec<_>>()
        };
        assert_eq!(first(&a), first(&b));
    }
}
