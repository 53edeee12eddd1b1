//! OBJ file loader for 3D models
//!
//! Reads positions (`v`), texture coordinates (`vt`), normals (`vn`) and
//! faces (`f`). Faces with more than three corners are fan-triangulated.
//! Indices may be 1-based or negative (relative to the end of the list read
//! so far). Everything else (materials, groups, smoothing) is ignored.

use std::fs;
use std::path::Path;

use crate::foundation::math::Vec3;
use crate::render::{Mesh, MeshError, Vertex};

/// Wavefront OBJ mesh provider
pub struct ObjLoader;

#[derive(Default)]
struct ObjData {
    positions: Vec<[f32; 3]>,
    tex_coords: Vec<[f32; 2]>,
    normals: Vec<[f32; 3]>,
}

/// One `v/vt/vn` reference, already resolved to 0-based indices
struct Corner {
    position: usize,
    tex_coord: Option<usize>,
    normal: Option<usize>,
}

impl ObjLoader {
    /// Load an OBJ file and return a mesh
    pub fn load_obj<P: AsRef<Path>>(path: P) -> Result<Mesh, MeshError> {
        let path = path.as_ref();
        let source = fs::read_to_string(path)?;
        let mesh = Self::parse_obj(&source)?;
        log::info!(
            "Loaded {} faces from {}",
            mesh.face_count(),
            path.display()
        );
        Ok(mesh)
    }

    /// Parse OBJ source text into a mesh
    pub fn parse_obj(source: &str) -> Result<Mesh, MeshError> {
        let mut data = ObjData::default();
        let mut vertices = Vec::new();

        for (line_index, line) in source.lines().enumerate() {
            let line_number = line_index + 1;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let mut parts = line.split_whitespace();
            let Some(keyword) = parts.next() else {
                continue;
            };
            let arguments: Vec<&str> = parts.collect();

            match keyword {
                "v" => data.positions.push(parse_floats(&arguments, line_number)?),
                "vn" => data.normals.push(parse_floats(&arguments, line_number)?),
                "vt" => data.tex_coords.push(parse_floats(&arguments, line_number)?),
                "f" => {
                    if arguments.len() < 3 {
                        return Err(parse_error(line_number, "face needs at least 3 corners"));
                    }
                    let corners = arguments
                        .iter()
                        .map(|token| data.resolve_corner(token, line_number))
                        .collect::<Result<Vec<_>, _>>()?;

                    for i in 1..corners.len() - 1 {
                        data.push_triangle([&corners[0], &corners[i], &corners[i + 1]], &mut vertices);
                    }
                }
                _ => {
                    // Ignore other commands
                }
            }
        }

        if vertices.is_empty() {
            return Err(MeshError::InvalidFormat("No faces found in OBJ source".to_string()));
        }

        Mesh::new(vertices)
    }
}

impl ObjData {
    fn resolve_corner(&self, token: &str, line: usize) -> Result<Corner, MeshError> {
        let mut fields = token.split('/');
        let position = fields
            .next()
            .filter(|field| !field.is_empty())
            .ok_or_else(|| parse_error(line, "face corner without position index"))?;
        let position = resolve_index(position, self.positions.len(), line)?;

        let tex_coord = match fields.next() {
            Some(field) if !field.is_empty() => Some(resolve_index(field, self.tex_coords.len(), line)?),
            _ => None,
        };
        let normal = match fields.next() {
            Some(field) if !field.is_empty() => Some(resolve_index(field, self.normals.len(), line)?),
            _ => None,
        };

        Ok(Corner {
            position,
            tex_coord,
            normal,
        })
    }

    fn push_triangle(&self, corners: [&Corner; 3], vertices: &mut Vec<Vertex>) {
        let positions = corners.map(|corner| self.positions[corner.position]);

        // Flat normal for corners that do not name one
        let [a, b, c] = positions.map(Vec3::from);
        let face_normal = (b - a)
            .cross(&(c - a))
            .try_normalize(f32::EPSILON)
            .unwrap_or_else(|| Vec3::new(0.0, 1.0, 0.0));

        for (corner, position) in corners.into_iter().zip(positions) {
            let normal = corner
                .normal
                .map_or(face_normal.into(), |index| self.normals[index]);
            let tex_coord = corner
                .tex_coord
                .map_or([0.0, 0.0], |index| self.tex_coords[index]);
            vertices.push(Vertex::new(position, normal, tex_coord));
        }
    }
}

fn parse_error(line: usize, message: impl Into<String>) -> MeshError {
    MeshError::Parse {
        line,
        message: message.into(),
    }
}

/// Read the first `N` numbers of a `v`/`vn`/`vt` line
fn parse_floats<const N: usize>(arguments: &[&str], line: usize) -> Result<[f32; N], MeshError> {
    if arguments.len() < N {
        return Err(parse_error(line, format!("expected {} numbers, found {}", N, arguments.len())));
    }

    let mut values = [0.0; N];
    for (value, token) in values.iter_mut().zip(arguments) {
        *value = token
            .parse()
            .map_err(|_| parse_error(line, format!("invalid number `{token}`")))?;
    }
    Ok(values)
}

/// Turn a 1-based or negative OBJ index into a 0-based one
fn resolve_index(token: &str, count: usize, line: usize) -> Result<usize, MeshError> {
    let index: i64 = token
        .parse()
        .map_err(|_| parse_error(line, format!("invalid index `{token}`")))?;

    let resolved = match index {
        0 => None,
        i if i > 0 => usize::try_from(i - 1).ok(),
        i => usize::try_from(count as i64 + i).ok(),
    };

    resolved
        .filter(|&index| index < count)
        .ok_or_else(|| parse_error(line, format!("index {index} out of range (have {count})")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUAD: &str = "
# unit quad in the xy plane
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vt 0 0
vt 1 0
vt 1 1
vt 0 1
vn 0 0 1
f 1/1/1 2/2/1 3/3/1 4/4/1
";

    #[test]
    fn test_quad_is_fan_triangulated() {
        let mesh = ObjLoader::parse_obj(QUAD).unwrap();

        assert_eq!(mesh.face_count(), 2);
        let vertices = mesh.vertices();
        assert_eq!(vertices[0].position, [0.0, 0.0, 0.0]);
        assert_eq!(vertices[2].position, [1.0, 1.0, 0.0]);
        assert_eq!(vertices[3].position, [0.0, 0.0, 0.0]);
        assert_eq!(vertices[5].position, [0.0, 1.0, 0.0]);
        assert_eq!(vertices[5].tex_coord, [0.0, 1.0]);
        assert!(vertices.iter().all(|v| v.normal == [0.0, 0.0, 1.0]));
    }

    #[test]
    fn test_negative_indices() {
        let source = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf -3 -2 -1\n";
        let mesh = ObjLoader::parse_obj(source).unwrap();

        assert_eq!(mesh.face_count(), 1);
        assert_eq!(mesh.vertices()[1].position, [1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_missing_normals_use_face_normal() {
        let source = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";
        let mesh = ObjLoader::parse_obj(source).unwrap();

        assert!(mesh.vertices().iter().all(|v| v.normal == [0.0, 0.0, 1.0]));
        assert!(mesh.vertices().iter().all(|v| v.tex_coord == [0.0, 0.0]));
    }

    #[test]
    fn test_position_and_normal_only() {
        let source = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvn 0 1 0\nf 1//1 2//1 3//1\n";
        let mesh = ObjLoader::parse_obj(source).unwrap();

        assert!(mesh.vertices().iter().all(|v| v.normal == [0.0, 1.0, 0.0]));
    }

    #[test]
    fn test_out_of_range_index_reports_line() {
        let source = "v 0 0 0\nv 1 0 0\nf 1 2 3\n";
        let result = ObjLoader::parse_obj(source);

        assert!(matches!(result, Err(MeshError::Parse { line: 3, .. })));
    }

    #[test]
    fn test_bad_number_and_empty_source() {
        assert!(matches!(
            ObjLoader::parse_obj("v 0 zero 0\n"),
            Err(MeshError::Parse { line: 1, .. })
        ));
        assert!(matches!(
            ObjLoader::parse_obj("# nothing\n"),
            Err(MeshError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            ObjLoader::load_obj("does/not/exist.obj"),
            Err(MeshError::Io(_))
        ));
    }
}
