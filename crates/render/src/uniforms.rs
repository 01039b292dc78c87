use crate::program::{ProgramError, ShaderProgram};
use glam::{Vec2, Vec3, Vec4};
use std::collections::BTreeMap;

/// Scalar and vector types a uniform slot can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformKind {
    Float,
    Int,
    Uint,
    Vec2,
    Vec3,
    Vec4,
}

impl UniformKind {
    /// Bytes written for a value of this kind. Padding is the layout's job.
    pub fn size(self) -> u32 {
        match self {
            UniformKind::Float | UniformKind::Int | UniformKind::Uint => 4,
            UniformKind::Vec2 => 8,
            UniformKind::Vec3 => 12,
            UniformKind::Vec4 => 16,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Int(i32),
    Uint(u32),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
}

impl UniformValue {
    pub fn kind(&self) -> UniformKind {
        match self {
            UniformValue::Float(_) => UniformKind::Float,
            UniformValue::Int(_) => UniformKind::Int,
            UniformValue::Uint(_) => UniformKind::Uint,
            UniformValue::Vec2(_) => UniformKind::Vec2,
            UniformValue::Vec3(_) => UniformKind::Vec3,
            UniformValue::Vec4(_) => UniformKind::Vec4,
        }
    }

    fn write_to(&self, dst: &mut [u8]) {
        match self {
            UniformValue::Float(v) => dst.copy_from_slice(bytemuck::bytes_of(v)),
            UniformValue::Int(v) => dst.copy_from_slice(bytemuck::bytes_of(v)),
            UniformValue::Uint(v) => dst.copy_from_slice(bytemuck::bytes_of(v)),
            UniformValue::Vec2(v) => dst.copy_from_slice(bytemuck::cast_slice(&v.to_array())),
            UniformValue::Vec3(v) => dst.copy_from_slice(bytemuck::cast_slice(&v.to_array())),
            UniformValue::Vec4(v) => dst.copy_from_slice(bytemuck::cast_slice(&v.to_array())),
        }
    }
}

impl From<f32> for UniformValue {
    fn from(v: f32) -> Self {
        UniformValue::Float(v)
    }
}

impl From<i32> for UniformValue {
    fn from(v: i32) -> Self {
        UniformValue::Int(v)
    }
}

impl From<u32> for UniformValue {
    fn from(v: u32) -> Self {
        UniformValue::Uint(v)
    }
}

impl From<Vec2> for UniformValue {
    fn from(v: Vec2) -> Self {
        UniformValue::Vec2(v)
    }
}

impl From<Vec3> for UniformValue {
    fn from(v: Vec3) -> Self {
        UniformValue::Vec3(v)
    }
}

impl From<Vec4> for UniformValue {
    fn from(v: Vec4) -> Self {
        UniformValue::Vec4(v)
    }
}

/// A resolved uniform: where it lives in the block and what it holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformLocation {
    slot: usize,
    offset: u32,
    kind: UniformKind,
}

impl UniformLocation {
    /// Index of the slot in its layout, in declaration order.
    pub fn slot(&self) -> usize {
        self.slot
    }

    pub fn offset(&self) -> u32 {
        self.offset
    }

    pub fn kind(&self) -> UniformKind {
        self.kind
    }
}

#[derive(Debug, Clone)]
struct Slot {
    name: String,
    offset: u32,
    kind: UniformKind,
}

/// Name-to-location table for one uniform block.
///
/// Built once when the program is linked (from shader reflection, or by hand
/// in tests). Names use GLSL host-API spelling: `shapes[2].material.color`.
#[derive(Debug, Clone, Default)]
pub struct UniformLayout {
    slots: Vec<Slot>,
    index: BTreeMap<String, usize>,
    size: u32,
}

impl UniformLayout {
    /// Empty layout for a block of `size` bytes.
    pub fn new(size: u32) -> Self {
        Self {
            size,
            ..Default::default()
        }
    }

    pub fn push(
        &mut self,
        name: impl Into<String>,
        offset: u32,
        kind: UniformKind,
    ) -> Result<UniformLocation, ProgramError> {
        let name = name.into();
        if offset + kind.size() > self.size {
            return Err(ProgramError::OutOfBounds {
                name,
                offset,
                size: self.size,
            });
        }
        if self.index.contains_key(&name) {
            return Err(ProgramError::DuplicateUniform(name));
        }
        let slot = self.slots.len();
        self.index.insert(name.clone(), slot);
        self.slots.push(Slot { name, offset, kind });
        Ok(UniformLocation { slot, offset, kind })
    }

    pub fn locate(&self, name: &str) -> Result<UniformLocation, ProgramError> {
        let slot = *self
            .index
            .get(name)
            .ok_or_else(|| ProgramError::MissingUniform(name.to_string()))?;
        let s = &self.slots[slot];
        Ok(UniformLocation {
            slot,
            offset: s.offset,
            kind: s.kind,
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Name of the slot behind `location`, if it came from this layout.
    pub fn name(&self, location: UniformLocation) -> Option<&str> {
        self.slots.get(location.slot).map(|s| s.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Block size in bytes.
    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.slots.iter().map(|s| s.name.as_str())
    }
}

/// Host-side mirror of a uniform block.
///
/// Writes land in a byte buffer laid out per the [`UniformLayout`]; the
/// backend uploads the whole buffer when it is dirty.
#[derive(Debug, Clone)]
pub struct UniformBlock {
    layout: UniformLayout,
    data: Vec<u8>,
    dirty: bool,
}

impl UniformBlock {
    pub fn new(layout: UniformLayout) -> Self {
        let data = vec![0; layout.size() as usize];
        Self {
            layout,
            data,
            dirty: true,
        }
    }

    pub fn layout(&self) -> &UniformLayout {
        &self.layout
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Clear the dirty flag, returning whether an upload is due.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }
}

impl ShaderProgram for UniformBlock {
    fn locate(&self, name: &str) -> Result<UniformLocation, ProgramError> {
        self.layout.locate(name)
    }

    fn write(&mut self, location: UniformLocation, value: UniformValue) -> Result<(), ProgramError> {
        let name = || {
            self.layout
                .name(location)
                .unwrap_or("<foreign location>")
                .to_string()
        };
        if value.kind() != location.kind {
            return Err(ProgramError::TypeMismatch {
                name: name(),
                expected: location.kind,
                actual: value.kind(),
            });
        }
        let start = location.offset as usize;
        let end = start + location.kind.size() as usize;
        let Some(dst) = self.data.get_mut(start..end) else {
            return Err(ProgramError::OutOfBounds {
                name: name(),
                offset: location.offset,
                size: self.layout.size(),
            });
        };
        value.write_to(dst);
        self.dirty = true;
        Ok(())
    }
}
