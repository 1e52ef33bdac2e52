use crate::scene::{Light, MAX_UNIFORM_LIGHTS};

/// Indexable light list abstraction.
///
/// Two backing strategies exist, selected once at pipeline setup from
/// device capability. Both must yield identical lights for every index
/// below `min(capacity, active_count)`; the fixed-capacity variant is a
/// capability fallback, not a behavioral difference.
pub trait LightSource {
    fn light_at(&self, index: usize) -> Option<&Light>;
    fn active_count(&self) -> usize;
    fn capacity(&self) -> usize;
}

/// Dynamically sized light list, backed on the GPU by a read-only storage
/// buffer.
#[derive(Debug, Clone, Default)]
pub struct StorageLightList {
    lights: Vec<Light>,
}

impl StorageLightList {
    pub fn push(&mut self, light: Light) {
        self.lights.push(light);
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }
}

impl From<Vec<Light>> for StorageLightList {
    fn from(lights: Vec<Light>) -> Self {
        Self { lights }
    }
}

impl LightSource for StorageLightList {
    #[inline]
    fn light_at(&self, index: usize) -> Option<&Light> {
        self.lights.get(index)
    }

    #[inline]
    fn active_count(&self) -> usize {
        self.lights.len()
    }

    #[inline]
    fn capacity(&self) -> usize {
        usize::MAX
    }
}

/// Fixed-capacity light list, backed on the GPU by a uniform array of
/// [`MAX_UNIFORM_LIGHTS`] entries for devices without fragment-stage
/// storage buffers.
///
/// Pushing beyond capacity silently truncates to the first
/// `MAX_UNIFORM_LIGHTS` lights, matching the fixed loop bound used for
/// shading.
#[derive(Debug, Clone)]
pub struct UniformLightList {
    lights: [Light; MAX_UNIFORM_LIGHTS],
    count: usize,
}

impl Default for UniformLightList {
    fn default() -> Self {
        Self {
            lights: [Light::point(glam::Vec3::ZERO, glam::Vec3::ZERO); MAX_UNIFORM_LIGHTS],
            count: 0,
        }
    }
}

impl UniformLightList {
    pub fn from_slice(lights: &[Light]) -> Self {
        let mut list = Self::default();
        for light in lights {
            list.push(*light);
        }
        list
    }

    /// Adds a light; excess lights beyond capacity are dropped.
    pub fn push(&mut self, light: Light) {
        if self.count == MAX_UNIFORM_LIGHTS {
            log::debug!("uniform light list full; dropping light");
            return;
        }
        self.lights[self.count] = light;
        self.count += 1;
    }
}

impl LightSource for UniformLightList {
    #[inline]
    fn light_at(&self, index: usize) -> Option<&Light> {
        if index < self.count {
            self.lights.get(index)
        } else {
            None
        }
    }

    #[inline]
    fn active_count(&self) -> usize {
        self.count
    }

    #[inline]
    fn capacity(&self) -> usize {
        MAX_UNIFORM_LIGHTS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn light(i: usize) -> Light {
        Light::point(Vec3::new(i as f32, 5.0, 0.0), Vec3::ONE)
    }

    #[test]
    fn uniform_list_truncates_at_capacity() {
        let lights: Vec<Light> = (0..12).map(light).collect();
        let list = UniformLightList::from_slice(&lights);

        assert_eq!(list.active_count(), MAX_UNIFORM_LIGHTS);
        assert!(list.light_at(MAX_UNIFORM_LIGHTS).is_none());

        // The first N lights survive in order.
        for i in 0..MAX_UNIFORM_LIGHTS {
            assert_eq!(
                list.light_at(i).unwrap().position,
                lights[i].position
            );
        }
    }

    #[test]
    fn strategies_agree_on_shared_indices() {
        let lights: Vec<Light> = (0..6).map(light).collect();
        let dynamic = StorageLightList::from(lights.clone());
        let fixed = UniformLightList::from_slice(&lights);

        for i in 0..6 {
            assert_eq!(
                dynamic.light_at(i).unwrap().position,
                fixed.light_at(i).unwrap().position
            );
        }
        assert!(dynamic.light_at(6).is_none());
        assert!(fixed.light_at(6).is_none());
    }
}
