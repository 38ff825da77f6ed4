//! Flat arena of named scene objects.
//!
//! Objects are addressed by [`ObjectId`]. Name and tag lookups exist for
//! bootstrap binding only; controllers resolve once and keep the ID.

use nalgebra::{UnitQuaternion, Vector3};
use std::collections::BTreeMap;

use super::animation::Animator;

/// Stable handle to a scene object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u64);

/// World pose of an object.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vector3<f32>,
    pub rotation: UnitQuaternion<f32>,
}

impl Transform {
    pub fn from_position(position: Vector3<f32>) -> Self {
        Self {
            position,
            rotation: UnitQuaternion::identity(),
        }
    }

    pub fn forward(&self) -> Vector3<f32> {
        self.rotation * Vector3::z()
    }

    pub fn right(&self) -> Vector3<f32> {
        self.rotation * Vector3::x()
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::from_position(Vector3::zeros())
    }
}

#[derive(Debug, Clone)]
pub struct SceneObject {
    pub id: ObjectId,
    pub name: String,
    pub tag: Option<String>,
    pub transform: Transform,
    pub animator: Option<Animator>,
}

#[derive(Debug, Default)]
pub struct Scene {
    objects: BTreeMap<ObjectId, SceneObject>,
    next_id: u64,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an object and returns its ID.
    pub fn spawn(&mut self, name: &str, tag: Option<&str>, transform: Transform) -> ObjectId {
        self.next_id += 1;
        let id = ObjectId(self.next_id);
        self.objects.insert(
            id,
            SceneObject {
                id,
                name: name.to_string(),
                tag: tag.map(str::to_string),
                transform,
                animator: None,
            },
        );
        id
    }

    pub fn despawn(&mut self, id: ObjectId) -> Option<SceneObject> {
        self.objects.remove(&id)
    }

    pub fn get(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects.get(&id)
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut SceneObject> {
        self.objects.get_mut(&id)
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.objects.contains_key(&id)
    }

    pub fn transform(&self, id: ObjectId) -> Option<&Transform> {
        self.objects.get(&id).map(|o| &o.transform)
    }

    pub fn transform_mut(&mut self, id: ObjectId) -> Option<&mut Transform> {
        self.objects.get_mut(&id).map(|o| &mut o.transform)
    }

    pub fn position(&self, id: ObjectId) -> Option<Vector3<f32>> {
        self.transform(id).map(|t| t.position)
    }

    pub fn animator(&self, id: ObjectId) -> Option<&Animator> {
        self.objects.get(&id)?.animator.as_ref()
    }

    pub fn animator_mut(&mut self, id: ObjectId) -> Option<&mut Animator> {
        self.objects.get_mut(&id)?.animator.as_mut()
    }

    pub fn set_animator(&mut self, id: ObjectId, animator: Animator) -> bool {
        match self.objects.get_mut(&id) {
            Some(object) => {
                object.animator = Some(animator);
                true
            }
            None => false,
        }
    }

    /// First object with this exact name, lowest ID first.
    pub fn find_by_name(&self, name: &str) -> Option<ObjectId> {
        self.objects
            .values()
            .find(|o| o.name == name)
            .map(|o| o.id)
    }

    /// First object carrying this tag, lowest ID first.
    pub fn find_by_tag(&self, tag: &str) -> Option<ObjectId> {
        self.objects
            .values()
            .find(|o| o.tag.as_deref() == Some(tag))
            .map(|o| o.id)
    }

    /// Tag lookup first, then name. Empty strings are skipped.
    pub fn find_by_tag_or_name(&self, tag: &str, name: &str) -> Option<ObjectId> {
        let by_tag = if tag.is_empty() { None } else { self.find_by_tag(tag) };
        by_tag.or_else(|| {
            if name.is_empty() {
                None
            } else {
                self.find_by_name(name)
            }
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &SceneObject> {
        self.objects.values()
    }

    /// Advances every animator's cross-fades.
    pub fn tick_animators(&mut self, dt: f32) {
        for object in self.objects.values_mut() {
            if let Some(animator) = &mut object.animator {
                animator.tick(dt);
            }
        }
    }
}
