use crate::component::EntityId;
use crate::error::ShaderCacheError;
use crate::shader::{Dimension, ShaderKey};
use derivative::Derivative;
use std::collections::{HashMap, HashSet};

/// Releases a shader leaving the cache through invalidation, a rejected
/// insert, [`ShaderCache::clear`] or drop.
pub type FreeFn<S> = Box<dyn FnMut(S)>;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats
{
        pub hits: u64,

        pub misses: u64,

        pub inserts: u64,

        /// Entries dropped by invalidation or `clear`.
        pub evictions: u64,
}

/// Owning map from [`ShaderKey`] to shader with a reverse index per key
/// dimension.
///
/// Every stored key is listed under each of its [`ShaderKey::dimensions`]
/// and nowhere else, so invalidating one dimension value touches only the
/// entries that name it.
#[derive(Derivative)]
#[derivative(Debug(bound = ""))]
pub struct ShaderCache<S>
{
        #[derivative(Debug = "ignore")]
        entries: HashMap<ShaderKey, S>,

        index: HashMap<Dimension, HashSet<ShaderKey>>,

        #[derivative(Debug = "ignore")]
        free: FreeFn<S>,

        stats: CacheStats,
}

impl<S: 'static> Default for ShaderCache<S>
{
        fn default() -> Self
        {
                Self::new(drop)
        }
}

impl<S> ShaderCache<S>
{
        pub fn new(free: impl FnMut(S) + 'static) -> Self
        {
                Self {
                        entries: HashMap::new(),
                        index: HashMap::new(),
                        free: Box::new(free),
                        stats: CacheStats::default(),
                }
        }

        pub fn len(&self) -> usize
        {
                self.entries.len()
        }

        pub fn is_empty(&self) -> bool
        {
                self.entries.is_empty()
        }

        pub fn stats(&self) -> CacheStats
        {
                self.stats
        }

        pub fn contains(
                &self,
                key: &ShaderKey,
        ) -> bool
        {
                self.entries.contains_key(key)
        }

        pub fn keys(&self) -> impl Iterator<Item = &ShaderKey>
        {
                self.entries.keys()
        }

        /// Number of keys indexed under `dimension`.
        pub fn indexed(
                &self,
                dimension: &Dimension,
        ) -> usize
        {
                self.index.get(dimension).map_or(0, HashSet::len)
        }

        /// Looks a key up, counting the hit or miss.
        pub fn lookup(
                &mut self,
                key: &ShaderKey,
        ) -> Option<&S>
        {
                match self.entries.get(key)
                {
                        Some(shader) =>
                        {
                                self.stats.hits += 1;
                                Some(shader)
                        }
                        None =>
                        {
                                self.stats.misses += 1;
                                None
                        }
                }
        }

        /// Takes ownership of `shader`. A key that is already cached is an
        /// error; the rejected shader is released through the free-function.
        pub fn insert(
                &mut self,
                key: ShaderKey,
                shader: S,
        ) -> Result<(), ShaderCacheError>
        {
                if self.entries.contains_key(&key)
                {
                        (self.free)(shader);

                        return Err(ShaderCacheError::DuplicateKey(key));
                }

                for dimension in key.dimensions()
                {
                        self.index.entry(dimension).or_default().insert(key);
                }

                self.entries.insert(key, shader);
                self.stats.inserts += 1;

                Ok(())
        }

        /// Returns the cached shader for `key`, building and inserting it on a
        /// miss. A failed build leaves the cache untouched.
        pub fn get_or_try_insert_with<F>(
                &mut self,
                key: ShaderKey,
                build: F,
        ) -> anyhow::Result<&S>
        where
                F: FnOnce(&ShaderKey) -> anyhow::Result<S>,
        {
                if self.entries.contains_key(&key)
                {
                        self.stats.hits += 1;
                }
                else
                {
                        self.stats.misses += 1;

                        let shader = build(&key)?;

                        log::debug!("Compiled shader for {}", key);

                        for dimension in key.dimensions()
                        {
                                self.index.entry(dimension).or_default().insert(key);
                        }

                        self.stats.inserts += 1;

                        return Ok(self.entries.entry(key).or_insert(shader));
                }

                self.entries
                        .get(&key)
                        .ok_or_else(|| anyhow::anyhow!("shader for {} vanished", key))
        }

        /// Removes an entry and hands the shader back to the caller instead
        /// of freeing it.
        pub fn remove(
                &mut self,
                key: &ShaderKey,
        ) -> Option<S>
        {
                let shader = self.entries.remove(key)?;

                self.unindex(key);

                Some(shader)
        }

        /// Frees every entry whose key has the given dimension value and
        /// returns how many there were.
        pub fn invalidate(
                &mut self,
                dimension: Dimension,
        ) -> usize
        {
                let Some(keys) = self.index.remove(&dimension)
                else
                {
                        return 0;
                };

                let mut freed = 0;

                for key in keys.iter()
                {
                        self.unindex(key);

                        if let Some(shader) = self.entries.remove(key)
                        {
                                (self.free)(shader);
                                freed += 1;
                        }
                }

                self.stats.evictions += freed as u64;

                log::debug!("Invalidated {} shader(s) for {:?}", freed, dimension);

                freed
        }

        pub fn invalidate_scene(
                &mut self,
                scene: EntityId,
        ) -> usize
        {
                self.invalidate(Dimension::Scene(scene))
        }

        pub fn invalidate_camera(
                &mut self,
                camera: EntityId,
        ) -> usize
        {
                self.invalidate(Dimension::Camera(camera))
        }

        pub fn invalidate_light(
                &mut self,
                light: EntityId,
        ) -> usize
        {
                self.invalidate(Dimension::Light(light))
        }

        pub fn invalidate_model(
                &mut self,
                model: EntityId,
        ) -> usize
        {
                self.invalidate(Dimension::Model(model))
        }

        pub fn invalidate_material(
                &mut self,
                material: EntityId,
        ) -> usize
        {
                self.invalidate(Dimension::Material(material))
        }

        pub fn invalidate_user_data(
                &mut self,
                user_data: u64,
        ) -> usize
        {
                self.invalidate(Dimension::UserData(user_data))
        }

        /// Frees every entry and all index storage.
        pub fn clear(&mut self)
        {
                let freed = self.entries.len();

                for (_, shader) in self.entries.drain()
                {
                        (self.free)(shader);
                }

                self.index.clear();
                self.stats.evictions += freed as u64;

                if freed > 0
                {
                        log::debug!("Cleared {} shader(s)", freed);
                }
        }

        fn unindex(
                &mut self,
                key: &ShaderKey,
        )
        {
                for dimension in key.dimensions()
                {
                        if let Some(keys) = self.index.get_mut(&dimension)
                        {
                                keys.remove(key);

                                if keys.is_empty()
                                {
                                        self.index.remove(&dimension);
                                }
                        }
                }
        }
}

impl<S> Drop for ShaderCache<S>
{
        fn drop(&mut self)
        {
                self.clear();
        }
}

#[cfg(test)]
mod tests
{
        use super::*;
        use crate::component::EntityId;
        use std::cell::RefCell;
        use std::rc::Rc;

        fn key(
                scene: u64,
                camera: u64,
                light: u64,
                model: u64,
                material: u64,
        ) -> ShaderKey
        {
                ShaderKey {
                        scene: EntityId(scene),
                        camera: EntityId(camera),
                        light: Some(EntityId(light)),
                        model: EntityId(model),
                        material: Some(EntityId(material)),
                        user_data: None,
                }
        }

        fn tracked() -> (ShaderCache<&'static str>, Rc<RefCell<Vec<&'static str>>>)
        {
                let freed = Rc::new(RefCell::new(Vec::new()));
                let sink = freed.clone();

                (ShaderCache::new(move |s| sink.borrow_mut().push(s)), freed)
        }

        #[test]
        fn invalidation_drops_only_matching_keys()
        {
                let (mut cache, freed) = tracked();

                let first = key(1, 1, 1, 1, 1);
                let second = key(1, 2, 1, 1, 1);

                cache.insert(first, "first").unwrap();
                cache.insert(second, "second").unwrap();

                assert_eq!(cache.invalidate_camera(EntityId(1)), 1);

                assert!(cache.lookup(&first).is_none());
                assert_eq!(cache.lookup(&second), Some(&"second"));
                assert_eq!(*freed.borrow(), vec!["first"]);

                // The dropped key is gone from the dimensions it shared too.
                assert_eq!(cache.indexed(&Dimension::Scene(EntityId(1))), 1);
                assert_eq!(cache.indexed(&Dimension::Material(EntityId(1))), 1);
                assert_eq!(cache.indexed(&Dimension::Camera(EntityId(1))), 0);
        }

        #[test]
        fn each_dimension_invalidates()
        {
                let dimensions = [
                        Dimension::Scene(EntityId(10)),
                        Dimension::Camera(EntityId(20)),
                        Dimension::Light(EntityId(30)),
                        Dimension::Model(EntityId(40)),
                        Dimension::Material(EntityId(50)),
                        Dimension::UserData(7),
                ];

                for dimension in dimensions
                {
                        let (mut cache, freed) = tracked();

                        let mut hit = key(10, 20, 30, 40, 50);
                        hit.user_data = Some(7);

                        cache.insert(hit, "hit").unwrap();
                        cache.insert(key(11, 21, 31, 41, 51), "miss").unwrap();

                        assert_eq!(cache.invalidate(dimension), 1, "{dimension:?}");
                        assert_eq!(*freed.borrow(), vec!["hit"]);
                        assert_eq!(cache.len(), 1);
                }
        }

        #[test]
        fn duplicate_insert_frees_the_rejected_shader()
        {
                let (mut cache, freed) = tracked();

                let k = key(1, 1, 1, 1, 1);

                cache.insert(k, "kept").unwrap();

                let err = cache.insert(k, "rejected").unwrap_err();

                assert_eq!(err, ShaderCacheError::DuplicateKey(k));
                assert_eq!(*freed.borrow(), vec!["rejected"]);
                assert_eq!(cache.lookup(&k), Some(&"kept"));
        }

        #[test]
        fn remove_returns_ownership()
        {
                let (mut cache, freed) = tracked();

                let k = key(1, 2, 3, 4, 5);

                cache.insert(k, "shader").unwrap();

                assert_eq!(cache.remove(&k), Some("shader"));
                assert_eq!(cache.remove(&k), None);
                assert!(freed.borrow().is_empty());
                assert_eq!(cache.indexed(&Dimension::Model(EntityId(4))), 0);

                cache.insert(k, "again").unwrap();
        }

        #[test]
        fn unlit_keys_skip_the_light_index()
        {
                let (mut cache, _) = tracked();

                let mut k = key(1, 1, 0, 1, 1);
                k.light = None;
                k.material = None;

                cache.insert(k, "unlit").unwrap();

                assert_eq!(cache.invalidate_light(EntityId(0)), 0);
                assert_eq!(cache.invalidate_material(EntityId(1)), 0);
                assert_eq!(cache.invalidate_model(EntityId(1)), 1);
                assert!(cache.is_empty());
        }

        #[test]
        fn get_or_try_insert_with_builds_once()
        {
                let (mut cache, _) = tracked();

                let k = key(1, 1, 1, 1, 1);
                let mut builds = 0;

                for _ in 0..3
                {
                        let shader = cache
                                .get_or_try_insert_with(k, |_| {
                                        builds += 1;
                                        Ok("built")
                                })
                                .unwrap();

                        assert_eq!(*shader, "built");
                }

                assert_eq!(builds, 1);
                assert_eq!(
                        cache.stats(),
                        CacheStats {
                                hits: 2,
                                misses: 1,
                                inserts: 1,
                                evictions: 0,
                        }
                );

                let failed = cache.get_or_try_insert_with(key(2, 2, 2, 2, 2), |_| {
                        anyhow::bail!("does not compile")
                });

                assert!(failed.is_err());
                assert_eq!(cache.len(), 1);
        }

        #[test]
        fn clear_and_drop_free_everything()
        {
                let (mut cache, freed) = tracked();

                cache.insert(key(1, 1, 1, 1, 1), "a").unwrap();
                cache.insert(key(2, 2, 2, 2, 2), "b").unwrap();

                cache.clear();

                assert_eq!(freed.borrow().len(), 2);
                assert!(cache.is_empty());
                assert_eq!(cache.indexed(&Dimension::Scene(EntityId(1))), 0);

                cache.insert(key(3, 3, 3, 3, 3), "c").unwrap();

                drop(cache);

                assert_eq!(freed.borrow().len(), 3);
        }
}
