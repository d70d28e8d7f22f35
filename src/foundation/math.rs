/// Row-major 4x4 matrix as handed over by the host (`m[row][col]`, translation in the last column).
pub type Mat4 = [[f32; 4]; 4];

/// 4x4 identity.
pub const MAT4_IDENTITY: Mat4 = [
    [1.0, 0.0, 0.0, 0.0],
    [0.0, 1.0, 0.0, 0.0],
    [0.0, 0.0, 1.0, 0.0],
    [0.0, 0.0, 0.0, 1.0],
];

/// 3-component vector.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vector3 {
    /// X component.
    pub x: f32,
    /// Y component.
    pub y: f32,
    /// Z component.
    pub z: f32,
}

impl Vector3 {
    /// Construct a vector.
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Components as an array.
    pub fn to_array(self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }
}

impl From<[f32; 3]> for Vector3 {
    fn from(v: [f32; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }
}

/// 2-component vector.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vector2 {
    /// X component.
    pub x: f32,
    /// Y component.
    pub y: f32,
}

/// Linear RGB color.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Color {
    /// Red.
    pub r: f32,
    /// Green.
    pub g: f32,
    /// Blue.
    pub b: f32,
}

impl From<[f32; 3]> for Color {
    fn from(v: [f32; 3]) -> Self {
        Self {
            r: v[0],
            g: v[1],
            b: v[2],
        }
    }
}

/// Linear RGB color with alpha.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AColor {
    /// Red.
    pub r: f32,
    /// Green.
    pub g: f32,
    /// Blue.
    pub b: f32,
    /// Alpha.
    pub a: f32,
}

/// 3x3 matrix stored as three column vectors (renderer convention).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Matrix3 {
    /// Columns.
    pub cols: [Vector3; 3],
}

impl Matrix3 {
    /// Identity matrix.
    pub const IDENTITY: Self = Self {
        cols: [
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
            Vector3::new(0.0, 0.0, 1.0),
        ],
    };
}

impl Default for Matrix3 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Affine transform: 3x3 linear part plus translation.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Transform {
    /// Linear part.
    pub matrix: Matrix3,
    /// Translation.
    pub offset: Vector3,
}

impl Transform {
    /// Identity transform.
    pub const IDENTITY: Self = Self {
        matrix: Matrix3::IDENTITY,
        offset: Vector3::new(0.0, 0.0, 0.0),
    };

    /// Pure translation.
    pub fn translation(offset: Vector3) -> Self {
        Self {
            matrix: Matrix3::IDENTITY,
            offset,
        }
    }

    /// Convert a host row-major 4x4 matrix, dropping the projective row.
    pub fn from_mat4(m: &Mat4) -> Self {
        let col = |c: usize| Vector3::new(m[0][c], m[1][c], m[2][c]);
        Self {
            matrix: Matrix3 {
                cols: [col(0), col(1), col(2)],
            },
            offset: col(3),
        }
    }
}

/// Multiply two row-major 4x4 matrices (`a * b`).
pub fn mat4_mul(a: &Mat4, b: &Mat4) -> Mat4 {
    let mut out = [[0.0f32; 4]; 4];
    for (r, row) in out.iter_mut().enumerate() {
        for (c, v) in row.iter_mut().enumerate() {
            *v = (0..4).map(|k| a[r][k] * b[k][c]).sum();
        }
    }
    out
}

/// Row-major translation matrix.
pub fn mat4_translation(t: [f32; 3]) -> Mat4 {
    let mut m = MAT4_IDENTITY;
    m[0][3] = t[0];
    m[1][3] = t[1];
    m[2][3] = t[2];
    m
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/math.rs"]
mod tests;
