//! Block-diagonal matrices of 3×3 blocks.

use std::ops::{AddAssign, Index, IndexMut, Mul, SubAssign};

use glam::Mat3;

use super::DenseVec3;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DiagMat33 {
    pub values: Vec<Mat3>,
}

impl DiagMat33 {
    pub fn zeros(n: usize) -> Self {
        Self {
            values: vec![Mat3::ZERO; n],
        }
    }

    pub fn identity(n: usize) -> Self {
        Self {
            values: vec![Mat3::IDENTITY; n],
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Block-wise inverse. Singular blocks invert to zero.
    pub fn inverse(&self) -> DiagMat33 {
        DiagMat33 {
            values: self
                .values
                .iter()
                .map(|m| {
                    if m.determinant().abs() > f32::EPSILON {
                        m.inverse()
                    } else {
                        Mat3::ZERO
                    }
                })
                .collect(),
        }
    }

    pub fn scale(&mut self, s: f32) {
        for m in &mut self.values {
            *m *= s;
        }
    }

    pub fn mul_vec(&self, x: &DenseVec3, out: &mut DenseVec3) {
        assert_eq!(x.len(), self.len());
        assert_eq!(out.len(), self.len());
        for (i, m) in self.values.iter().enumerate() {
            out[i] = *m * x[i];
        }
    }
}

impl Index<usize> for DiagMat33 {
    type Output = Mat3;

    fn index(&self, i: usize) -> &Mat3 {
        &self.values[i]
    }
}

impl IndexMut<usize> for DiagMat33 {
    fn index_mut(&mut self, i: usize) -> &mut Mat3 {
        &mut self.values[i]
    }
}

impl AddAssign<&DiagMat33> for DiagMat33 {
    fn add_assign(&mut self, rhs: &DiagMat33) {
        assert_eq!(self.len(), rhs.len());
        for (a, b) in self.values.iter_mut().zip(rhs.values.iter()) {
            *a += *b;
        }
    }
}

impl SubAssign<&DiagMat33> for DiagMat33 {
    fn sub_assign(&mut self, rhs: &DiagMat33) {
        assert_eq!(self.len(), rhs.len());
        for (a, b) in self.values.iter_mut().zip(rhs.values.iter()) {
            *a -= *b;
        }
    }
}

impl Mul<&DenseVec3> for &DiagMat33 {
    type Output = DenseVec3;

    fn mul(self, rhs: &DenseVec3) -> DenseVec3 {
        let mut out = DenseVec3::zeros(self.len());
        self.mul_vec(rhs, &mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn test_inverse_and_mul() {
        let mut d = DiagMat33::identity(2);
        d[1] = Mat3::from_diagonal(Vec3::new(2.0, 4.0, 8.0));
        let inv = d.inverse();
        let x = DenseVec3::from_vec(vec![Vec3::ONE, Vec3::new(2.0, 4.0, 8.0)]);
        let y = &inv * &x;
        assert_eq!(y[0], Vec3::ONE);
        assert!((y[1] - Vec3::ONE).length() < 1e-6);
    }

    #[test]
    fn test_singular_block_inverts_to_zero() {
        let d = DiagMat33::zeros(1);
        assert_eq!(d.inverse()[0], Mat3::ZERO);
    }
}
