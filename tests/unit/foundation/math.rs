use super::*;

#[test]
fn from_mat4_extracts_columns_and_translation() {
    let mut m = MAT4_IDENTITY;
    m[0][1] = 2.0;
    m[0][3] = 5.0;
    m[2][3] = -1.0;
    let t = Transform::from_mat4(&m);
    assert_eq!(t.matrix.cols[1], Vector3::new(2.0, 1.0, 0.0));
    assert_eq!(t.offset, Vector3::new(5.0, 0.0, -1.0));
}

#[test]
fn translations_compose() {
    let a = mat4_translation([1.0, 2.0, 3.0]);
    let b = mat4_translation([10.0, 0.0, 0.0]);
    let t = Transform::from_mat4(&mat4_mul(&a, &b));
    assert_eq!(t.offset, Vector3::new(11.0, 2.0, 3.0));
    assert_eq!(t.matrix, Matrix3::IDENTITY);
}
