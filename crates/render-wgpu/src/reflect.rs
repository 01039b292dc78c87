//! GLSL front end: parse, validate, and flatten the fragment uniform block.

use marchview_render::{ProgramError, UniformKind, UniformLayout};
use naga::front::glsl::{Frontend, Options};
use naga::valid::{Capabilities, ValidationFlags, Validator};
use naga::{
    AddressSpace, ArraySize, Handle, Module, ResourceBinding, Scalar, ScalarKind, ShaderStage,
    Type, TypeInner, VectorSize,
};

/// The block the raymarch program reads its uniforms from.
pub const UNIFORM_BINDING: ResourceBinding = ResourceBinding {
    group: 0,
    binding: 0,
};

pub(crate) fn stage_name(stage: ShaderStage) -> &'static str {
    match stage {
        ShaderStage::Vertex => "vertex",
        ShaderStage::Fragment => "fragment",
        ShaderStage::Compute => "compute",
    }
}

/// Parse GLSL into a naga module, rendering diagnostics against `source`.
pub fn parse(source: &str, stage: ShaderStage) -> Result<Module, ProgramError> {
    Frontend::default()
        .parse(&Options::from(stage), source)
        .map_err(|errors| ProgramError::Parse {
            stage: stage_name(stage),
            message: errors.emit_to_string(source),
        })
}

/// Parse and run naga's validator over one stage.
pub fn validate(source: &str, stage: ShaderStage) -> Result<Module, ProgramError> {
    let module = parse(source, stage)?;
    Validator::new(ValidationFlags::all(), Capabilities::all())
        .validate(&module)
        .map_err(|err| ProgramError::Parse {
            stage: stage_name(stage),
            message: err.emit_to_string(source),
        })?;
    Ok(module)
}

/// Build the name table for the uniform block at set 0, binding 0.
///
/// Members are named the way the GL host API spells them for an anonymous
/// block: `cam_pos`, `shapes[3].material.color`. Offsets are the std140
/// offsets naga computed while parsing.
pub fn reflect_uniforms(source: &str) -> Result<UniformLayout, ProgramError> {
    let module = parse(source, ShaderStage::Fragment)?;
    reflect_module(&module)
}

pub(crate) fn reflect_module(module: &Module) -> Result<UniformLayout, ProgramError> {
    let block = module
        .global_variables
        .iter()
        .map(|(_, var)| var)
        .find(|var| var.space == AddressSpace::Uniform && var.binding == Some(UNIFORM_BINDING))
        .ok_or(ProgramError::MissingUniformBlock)?;

    let TypeInner::Struct { members, span } = &module.types[block.ty].inner else {
        return Err(ProgramError::MissingUniformBlock);
    };

    let mut layout = UniformLayout::new(*span);
    for member in members {
        let name = member.name.as_deref().unwrap_or_default();
        flatten(module, member.ty, name, member.offset, &mut layout)?;
    }
    tracing::debug!(
        uniforms = layout.len(),
        bytes = layout.size(),
        "reflected uniform block"
    );
    Ok(layout)
}

fn flatten(
    module: &Module,
    ty: Handle<Type>,
    path: &str,
    offset: u32,
    layout: &mut UniformLayout,
) -> Result<(), ProgramError> {
    let kind = match &module.types[ty].inner {
        TypeInner::Scalar(scalar) => scalar_kind(*scalar),
        TypeInner::Vector { size, scalar } => vector_kind(*size, *scalar),
        TypeInner::Struct { members, .. } => {
            for member in members {
                let name = member.name.as_deref().unwrap_or_default();
                flatten(
                    module,
                    member.ty,
                    &format!("{path}.{name}"),
                    offset + member.offset,
                    layout,
                )?;
            }
            return Ok(());
        }
        TypeInner::Array {
            base,
            size: ArraySize::Constant(count),
            stride,
        } => {
            for i in 0..count.get() {
                flatten(
                    module,
                    *base,
                    &format!("{path}[{i}]"),
                    offset + i * stride,
                    layout,
                )?;
            }
            return Ok(());
        }
        _ => None,
    };
    match kind {
        Some(kind) => {
            layout.push(path, offset, kind)?;
        }
        // Matrices, bools and the like stay shader-side; looking one up fails
        // as a missing uniform.
        None => tracing::debug!(uniform = path, "skipping member the host cannot write"),
    }
    Ok(())
}

fn scalar_kind(scalar: Scalar) -> Option<UniformKind> {
    match (scalar.kind, scalar.width) {
        (ScalarKind::Float, 4) => Some(UniformKind::Float),
        (ScalarKind::Sint, 4) => Some(UniformKind::Int),
        (ScalarKind::Uint, 4) => Some(UniformKind::Uint),
        _ => None,
    }
}

fn vector_kind(size: VectorSize, scalar: Scalar) -> Option<UniformKind> {
    if scalar != Scalar::F32 {
        return None;
    }
    Some(match size {
        VectorSize::Bi => UniformKind::Vec2,
        VectorSize::Tri => UniformKind::Vec3,
        VectorSize::Quad => UniformKind::Vec4,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAGMENT: &str = r#"
#version 450

struct Material {
    vec3 color;
    int type;
};

struct Shape {
    vec3 position;
    vec3 size;
    int type;
    Material material;
};

layout(std140, set = 0, binding = 0) uniform Params {
    vec2 resolution;
    vec3 cam_pos;
    float sample_part;
    Shape shapes[3];
};

layout(location = 0) out vec4 frag_color;

void main() {
    frag_color = vec4(cam_pos + shapes[0].material.color, sample_part);
}
"#;

    #[test]
    fn top_level_members_keep_their_names() {
        let layout = reflect_uniforms(FRAGMENT).unwrap();
        assert_eq!(layout.locate("resolution").unwrap().offset(), 0);
        let cam_pos = layout.locate("cam_pos").unwrap();
        assert_eq!(cam_pos.offset(), 16);
        assert_eq!(cam_pos.kind(), UniformKind::Vec3);
        // A float packs into the tail of the preceding vec3.
        assert_eq!(layout.locate("sample_part").unwrap().offset(), 28);
    }

    #[test]
    fn arrays_and_nested_structs_are_expanded() {
        let layout = reflect_uniforms(FRAGMENT).unwrap();
        // resolution, cam_pos, sample_part + 3 shapes × 5 leaves.
        assert_eq!(layout.len(), 3 + 3 * 5);
        for j in 0..3 {
            for field in ["position", "size", "type", "material.color", "material.type"] {
                assert!(layout.contains(&format!("shapes[{j}].{field}")), "{j} {field}");
            }
        }
        assert!(!layout.contains("shapes[3].position"));
        assert_eq!(
            layout.locate("shapes[2].material.type").unwrap().kind(),
            UniformKind::Int
        );
    }

    #[test]
    fn array_elements_are_a_constant_stride_apart() {
        let layout = reflect_uniforms(FRAGMENT).unwrap();
        let at = |name: &str| layout.locate(name).unwrap().offset();
        let stride = at("shapes[1].position") - at("shapes[0].position");
        assert!(stride > 0 && stride % 16 == 0);
        assert_eq!(at("shapes[2].position") - at("shapes[1].position"), stride);
        assert!(at("shapes[0].material.color") > at("shapes[0].type"));
        assert!(at("shapes[2].material.type") + 4 <= layout.size());
    }

    #[test]
    fn members_the_host_cannot_write_are_skipped() {
        let src = r#"
#version 450

layout(std140, set = 0, binding = 0) uniform Params {
    vec2 resolution;
    vec3 cam_pos;
    vec3 cam_rot;
    mat4 extra;
    float after;
};

layout(location = 0) out vec4 frag_color;

void main() {
    frag_color = extra * vec4(cam_pos + cam_rot, resolution.x + after);
}
"#;
        let layout = reflect_uniforms(src).unwrap();
        assert_eq!(layout.len(), 4);
        assert_eq!(layout.locate("cam_rot").unwrap().offset(), 32);
        assert!(matches!(
            layout.locate("extra"),
            Err(ProgramError::MissingUniform(ref n)) if n == "extra"
        ));
        // mat4 occupies 64 bytes starting at 48.
        assert_eq!(layout.locate("after").unwrap().offset(), 112);
    }

    #[test]
    fn block_must_exist() {
        let src = "#version 450\nlayout(location = 0) out vec4 c;\nvoid main() { c = vec4(1.0); }\n";
        assert!(matches!(
            reflect_uniforms(src),
            Err(ProgramError::MissingUniformBlock)
        ));
    }

    #[test]
    fn parse_errors_carry_the_stage_and_diagnostics() {
        let err = reflect_uniforms("#version 450\nvoid main() { nope }\n").unwrap_err();
        match err {
            ProgramError::Parse { stage, message } => {
                assert_eq!(stage, "fragment");
                assert!(!message.is_empty());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn shipped_program_reflects_the_viewer_uniforms() {
        let dir = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../../program");
        let src = std::fs::read_to_string(dir.join("fragment.glsl")).unwrap();
        let layout = reflect_uniforms(&src).unwrap();
        for name in [
            "resolution",
            "cam_pos",
            "cam_rot",
            "u_seed1",
            "u_seed2",
            "sample_part",
            "shapes[0].material.color",
            "shapes[4].material.type",
        ] {
            assert!(layout.contains(name), "{name}");
        }
        assert!(!layout.contains("shapes[5].position"));
    }

    #[test]
    fn shipped_program_validates() {
        let dir = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../../program");
        for (file, stage) in [
            ("vertex.glsl", ShaderStage::Vertex),
            ("fragment.glsl", ShaderStage::Fragment),
            ("post.glsl", ShaderStage::Fragment),
        ] {
            let src = std::fs::read_to_string(dir.join(file)).unwrap();
            if let Err(err) = validate(&src, stage) {
                panic!("{file}: {err}");
            }
        }
    }
}
