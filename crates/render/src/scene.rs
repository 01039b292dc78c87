use crate::program::{ProgramError, ShaderProgram};
use crate::uniforms::{UniformLocation, UniformValue};
use glam::Vec3;
use marchview_common::ShapeDescriptor;

/// How the shader's `shapes[i]` struct spells its fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeLayout {
    /// `position`, `size`, `type`, `color`.
    Flat,
    /// `position`, `size`, `type`, `material.color`, `material.type`.
    WithMaterial,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShapeField {
    Position,
    Size,
    Type,
    Color,
    MaterialColor,
    MaterialType,
}

impl ShapeField {
    fn suffix(self) -> &'static str {
        match self {
            ShapeField::Position => "position",
            ShapeField::Size => "size",
            ShapeField::Type => "type",
            ShapeField::Color => "color",
            ShapeField::MaterialColor => "material.color",
            ShapeField::MaterialType => "material.type",
        }
    }

    fn value(self, shape: &ShapeDescriptor) -> UniformValue {
        match self {
            ShapeField::Position => shape.position.into(),
            ShapeField::Size => shape.size.into(),
            ShapeField::Type => shape.shape_type.into(),
            ShapeField::Color | ShapeField::MaterialColor => shape.color.into(),
            ShapeField::MaterialType => shape.material_type.into(),
        }
    }
}

impl ShapeLayout {
    /// Material layout if the program has `shapes[0].material.color`.
    pub fn detect(program: &impl ShaderProgram) -> Self {
        if program.has_uniform("shapes[0].material.color") {
            ShapeLayout::WithMaterial
        } else {
            ShapeLayout::Flat
        }
    }

    fn fields(self) -> &'static [ShapeField] {
        match self {
            ShapeLayout::Flat => &[
                ShapeField::Position,
                ShapeField::Size,
                ShapeField::Type,
                ShapeField::Color,
            ],
            ShapeLayout::WithMaterial => &[
                ShapeField::Position,
                ShapeField::Size,
                ShapeField::Type,
                ShapeField::MaterialColor,
                ShapeField::MaterialType,
            ],
        }
    }

    /// Uniform writes per shape.
    pub fn field_count(self) -> usize {
        self.fields().len()
    }
}

/// The static object list, uploaded into the program once.
#[derive(Debug, Clone)]
pub struct Scene {
    shapes: Vec<ShapeDescriptor>,
    layout: ShapeLayout,
}

impl Scene {
    /// The built-in five-object scene.
    pub fn default_shapes() -> Vec<ShapeDescriptor> {
        vec![
            ShapeDescriptor::new(
                Vec3::new(-2.0, 0.0, 0.0),
                Vec3::ONE,
                Vec3::new(0.8, 0.2, 0.1),
                0,
                0,
            ),
            ShapeDescriptor::new(Vec3::new(-2.0, 0.0, -3.0), Vec3::ONE, Vec3::ONE, 1, 0),
            ShapeDescriptor::new(
                Vec3::new(2.0, 0.0, 0.0),
                Vec3::ONE,
                Vec3::new(0.5, 0.4, 0.6),
                0,
                1,
            ),
            ShapeDescriptor::new(
                Vec3::new(6.0, 0.0, 0.0),
                Vec3::ONE,
                Vec3::new(0.5, 0.4, 0.6),
                0,
                1,
            ),
            ShapeDescriptor::new(
                Vec3::new(0.0, -1.0, 0.0),
                Vec3::new(0.0, 1.0, 0.0),
                Vec3::new(0.5, 0.2, 0.1),
                0,
                2,
            ),
        ]
    }

    /// Upload `shapes` into `program`.
    ///
    /// Every location is resolved before anything is written, so a missing
    /// name leaves the program untouched.
    pub fn new<P: ShaderProgram>(
        program: &mut P,
        shapes: Vec<ShapeDescriptor>,
    ) -> Result<Self, ProgramError> {
        let layout = ShapeLayout::detect(program);
        let mut writes: Vec<(UniformLocation, UniformValue)> =
            Vec::with_capacity(shapes.len() * layout.field_count());
        for (j, shape) in shapes.iter().enumerate() {
            for field in layout.fields() {
                let location = program.locate(&format!("shapes[{j}].{}", field.suffix()))?;
                writes.push((location, field.value(shape)));
            }
        }
        for (location, value) in writes {
            program.write(location, value)?;
        }

        let capacity = Self::capacity(program);
        if capacity > shapes.len() {
            tracing::warn!(
                uploaded = shapes.len(),
                capacity,
                "shape array not filled; remaining slots stay zeroed"
            );
        }
        tracing::info!(shapes = shapes.len(), ?layout, "scene uploaded");
        Ok(Self { shapes, layout })
    }

    /// Length of the program's `shapes` array, counted by contiguous indices.
    pub fn capacity(program: &impl ShaderProgram) -> usize {
        (0..)
            .take_while(|i| program.has_uniform(&format!("shapes[{i}].position")))
            .count()
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    pub fn layout(&self) -> ShapeLayout {
        self.layout
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uniforms::{UniformBlock, UniformKind, UniformLayout};

    /// Wraps a real block and records the name of every write.
    struct RecordingProgram {
        block: UniformBlock,
        writes: Vec<String>,
    }

    impl RecordingProgram {
        fn with_shapes(count: usize, material: bool) -> Self {
            let stride = 64;
            let mut layout = UniformLayout::new(stride * count as u32);
            for j in 0..count {
                let base = stride * j as u32;
                layout
                    .push(format!("shapes[{j}].position"), base, UniformKind::Vec3)
                    .unwrap();
                layout
                    .push(format!("shapes[{j}].size"), base + 16, UniformKind::Vec3)
                    .unwrap();
                layout
                    .push(format!("shapes[{j}].type"), base + 28, UniformKind::Int)
                    .unwrap();
                if material {
                    layout
                        .push(format!("shapes[{j}].material.color"), base + 32, UniformKind::Vec3)
                        .unwrap();
                    layout
                        .push(format!("shapes[{j}].material.type"), base + 44, UniformKind::Int)
                        .unwrap();
                } else {
                    layout
                        .push(format!("shapes[{j}].color"), base + 32, UniformKind::Vec3)
                        .unwrap();
                }
            }
            Self {
                block: UniformBlock::new(layout),
                writes: Vec::new(),
            }
        }
    }

    impl ShaderProgram for RecordingProgram {
        fn locate(&self, name: &str) -> Result<UniformLocation, ProgramError> {
            self.block.locate(name)
        }

        fn write(
            &mut self,
            location: UniformLocation,
            value: UniformValue,
        ) -> Result<(), ProgramError> {
            let name = self.block.layout().name(location).unwrap().to_string();
            self.writes.push(name);
            self.block.write(location, value)
        }
    }

    fn shapes(n: usize) -> Vec<ShapeDescriptor> {
        (0..n)
            .map(|i| {
                ShapeDescriptor::new(Vec3::splat(i as f32), Vec3::ONE, Vec3::X, i as i32, 0)
            })
            .collect()
    }

    #[test]
    fn flat_layout_writes_four_fields_per_shape() {
        let mut program = RecordingProgram::with_shapes(3, false);
        let scene = Scene::new(&mut program, shapes(3)).unwrap();

        assert_eq!(scene.layout(), ShapeLayout::Flat);
        assert_eq!(program.writes.len(), 3 * 4);
        for j in 0..3 {
            for field in ["position", "size", "type", "color"] {
                let name = format!("shapes[{j}].{field}");
                assert_eq!(
                    program.writes.iter().filter(|w| **w == name).count(),
                    1,
                    "{name}"
                );
            }
        }
    }

    #[test]
    fn material_layout_writes_five_fields_per_shape() {
        let mut program = RecordingProgram::with_shapes(5, true);
        let scene = Scene::new(&mut program, Scene::default_shapes()).unwrap();

        assert_eq!(scene.layout(), ShapeLayout::WithMaterial);
        assert_eq!(scene.len(), 5);
        assert_eq!(program.writes.len(), 5 * 5);
        assert!(program.writes.contains(&"shapes[4].material.type".to_string()));
        assert!(!program.writes.iter().any(|w| w.ends_with("].color")));
    }

    #[test]
    fn write_indices_are_zero_based_and_contiguous() {
        let mut program = RecordingProgram::with_shapes(4, false);
        Scene::new(&mut program, shapes(4)).unwrap();

        let mut indices: Vec<usize> = program
            .writes
            .iter()
            .map(|w| {
                let inner = w.strip_prefix("shapes[").unwrap();
                inner[..inner.find(']').unwrap()].parse().unwrap()
            })
            .collect();
        indices.dedup();
        assert_eq!(indices, vec![0, 1, 2, 3]);
    }

    #[test]
    fn too_many_shapes_fail_before_any_write() {
        let mut program = RecordingProgram::with_shapes(2, false);
        let err = Scene::new(&mut program, shapes(3)).unwrap_err();

        assert!(matches!(err, ProgramError::MissingUniform(ref n) if n == "shapes[2].position"));
        assert!(program.writes.is_empty());
    }

    #[test]
    fn fewer_shapes_than_capacity_is_allowed() {
        let mut program = RecordingProgram::with_shapes(4, false);
        let scene = Scene::new(&mut program, shapes(1)).unwrap();
        assert_eq!(scene.len(), 1);
        assert_eq!(Scene::capacity(&program), 4);
        assert_eq!(program.writes.len(), 4);
    }

    #[test]
    fn values_land_in_the_block() {
        let mut program = RecordingProgram::with_shapes(1, false);
        let shape = ShapeDescriptor::new(Vec3::new(1.0, 2.0, 3.0), Vec3::ONE, Vec3::Y, 7, 0);
        Scene::new(&mut program, vec![shape]).unwrap();

        let ty: i32 = bytemuck::pod_read_unaligned(&program.block.bytes()[28..32]);
        assert_eq!(ty, 7);
        let x: f32 = bytemuck::pod_read_unaligned(&program.block.bytes()[0..4]);
        assert_eq!(x, 1.0);
    }
}
