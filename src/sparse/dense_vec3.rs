//! Dense vectors of 3D blocks.

use std::ops::{Add, AddAssign, Index, IndexMut, Mul, MulAssign, Neg, Sub, SubAssign};

use glam::Vec3;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DenseVec3 {
    pub values: Vec<Vec3>,
}

impl DenseVec3 {
    pub fn zeros(n: usize) -> Self {
        Self {
            values: vec![Vec3::ZERO; n],
        }
    }

    pub fn from_vec(values: Vec<Vec3>) -> Self {
        Self { values }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn set_zero(&mut self) {
        self.values.fill(Vec3::ZERO);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Vec3> {
        self.values.iter()
    }

    pub fn dot(&self, other: &DenseVec3) -> f32 {
        assert_eq!(self.len(), other.len());
        self.values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| a.dot(*b))
            .sum()
    }

    pub fn length_squared(&self) -> f32 {
        self.dot(self)
    }

    pub fn norm(&self) -> f32 {
        self.length_squared().sqrt()
    }

    /// `self += s * x`.
    pub fn add_scaled(&mut self, s: f32, x: &DenseVec3) {
        assert_eq!(self.len(), x.len());
        for (a, b) in self.values.iter_mut().zip(x.values.iter()) {
            *a += s * *b;
        }
    }
}

impl Index<usize> for DenseVec3 {
    type Output = Vec3;

    fn index(&self, i: usize) -> &Vec3 {
        &self.values[i]
    }
}

impl IndexMut<usize> for DenseVec3 {
    fn index_mut(&mut self, i: usize) -> &mut Vec3 {
        &mut self.values[i]
    }
}

impl AddAssign<&DenseVec3> for DenseVec3 {
    fn add_assign(&mut self, rhs: &DenseVec3) {
        self.add_scaled(1.0, rhs);
    }
}

impl SubAssign<&DenseVec3> for DenseVec3 {
    fn sub_assign(&mut self, rhs: &DenseVec3) {
        self.add_scaled(-1.0, rhs);
    }
}

impl MulAssign<f32> for DenseVec3 {
    fn mul_assign(&mut self, s: f32) {
        for v in &mut self.values {
            *v *= s;
        }
    }
}

impl Add for &DenseVec3 {
    type Output = DenseVec3;

    fn add(self, rhs: &DenseVec3) -> DenseVec3 {
        let mut out = self.clone();
        out += rhs;
        out
    }
}

impl Sub for &DenseVec3 {
    type Output = DenseVec3;

    fn sub(self, rhs: &DenseVec3) -> DenseVec3 {
        let mut out = self.clone();
        out -= rhs;
        out
    }
}

impl Mul<&DenseVec3> for f32 {
    type Output = DenseVec3;

    fn mul(self, rhs: &DenseVec3) -> DenseVec3 {
        let mut out = rhs.clone();
        out *= self;
        out
    }
}

impl Neg for &DenseVec3 {
    type Output = DenseVec3;

    fn neg(self) -> DenseVec3 {
        -1.0 * self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vector_ops() {
        let a = DenseVec3::from_vec(vec![Vec3::X, Vec3::Y]);
        let b = DenseVec3::from_vec(vec![Vec3::Y, Vec3::new(0.0, 2.0, 0.0)]);
        assert_eq!(a.dot(&b), 2.0);
        let c = &a + &b;
        assert_eq!(c[0], Vec3::new(1.0, 1.0, 0.0));
        let d = &c - &b;
        assert_eq!(d, a);
        let e = 2.0 * &a;
        assert!((e.norm() - 8.0f32.sqrt()).abs() < 1e-6);
        assert_eq!((-&a)[1], -Vec3::Y);
    }
}
