//! Row-compressed sparse matrices of 3×3 blocks.
//!
//! Each row is an unordered list of blocks scanned linearly on access, with
//! at most one block per column. Row storage comes from a [`FrameArena`]
//! and goes back to it when the matrix is destroyed.

use std::ops::{Add, AddAssign, Index, IndexMut, Mul, MulAssign, Sub, SubAssign};

use glam::Mat3;

use super::arena::{FrameArena, Row, RowValue};
use super::{DenseVec3, DiagMat33};

static ZERO: Mat3 = Mat3::ZERO;

pub struct SparseMat33<'a> {
    arena: &'a FrameArena,
    rows: Vec<Row>,
}

impl<'a> SparseMat33<'a> {
    /// Creates an empty `n × n` block matrix.
    pub fn new(arena: &'a FrameArena, n: usize) -> Self {
        let rows = (0..n).map(|_| arena.take_row()).collect();
        Self { arena, rows }
    }

    /// Creates a matrix whose diagonal equals `diag`.
    pub fn from_diag(arena: &'a FrameArena, diag: &DiagMat33) -> Self {
        let mut m = Self::new(arena, diag.len());
        for (i, d) in diag.values.iter().enumerate() {
            m[(i, i)] = *d;
        }
        m
    }

    #[inline]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn row_len(&self, i: usize) -> usize {
        self.rows[i].len()
    }

    /// Number of stored blocks.
    pub fn nnz(&self) -> usize {
        self.rows.iter().map(Vec::len).sum()
    }

    /// Stored blocks of row `i` in insertion order.
    pub fn row(&self, i: usize) -> impl Iterator<Item = (usize, &Mat3)> {
        self.rows[i].iter().map(|v| (v.column as usize, &v.value))
    }

    /// Returns the block at `(i, j)`, or zero if it is not stored.
    /// Never inserts.
    pub fn get(&self, i: usize, j: usize) -> &Mat3 {
        self.rows[i]
            .iter()
            .find(|v| v.column == j as u32)
            .map_or(&ZERO, |v| &v.value)
    }

    /// Returns the block at `(i, j)`, inserting a zero block if absent.
    pub fn get_mut(&mut self, i: usize, j: usize) -> &mut Mat3 {
        debug_assert!(j < self.rows.len(), "column {j} out of range");
        let row = &mut self.rows[i];
        let k = match row.iter().position(|v| v.column == j as u32) {
            Some(k) => k,
            None => {
                row.push(RowValue {
                    column: j as u32,
                    value: Mat3::ZERO,
                });
                row.len() - 1
            }
        };
        &mut row[k].value
    }

    pub fn contains(&self, i: usize, j: usize) -> bool {
        self.rows[i].iter().any(|v| v.column == j as u32)
    }

    /// Scales every stored block. The sparsity pattern is kept.
    pub fn scale(&mut self, s: f32) {
        for row in &mut self.rows {
            for v in row.iter_mut() {
                v.value *= s;
            }
        }
    }

    /// `out = self * x`.
    pub fn mul_vec(&self, x: &DenseVec3, out: &mut DenseVec3) {
        assert_eq!(x.len(), self.row_count());
        assert_eq!(out.len(), self.row_count());
        for (i, row) in self.rows.iter().enumerate() {
            out[i] = row
                .iter()
                .fold(glam::Vec3::ZERO, |acc, v| acc + v.value * x[v.column as usize]);
        }
    }

    /// Overwrites `self` with the contents of `other`. Both must have the
    /// same number of rows.
    pub fn copy_from(&mut self, other: &SparseMat33<'_>) {
        assert_eq!(self.row_count(), other.row_count());
        for (dst, src) in self.rows.iter_mut().zip(other.rows.iter()) {
            dst.clear();
            dst.extend_from_slice(src);
        }
    }

    /// Removes every stored block but keeps the rows.
    pub fn set_zero(&mut self) {
        for row in &mut self.rows {
            row.clear();
        }
    }

    /// Returns all rows to the arena. Safe to call more than once.
    pub fn destroy(&mut self) {
        for row in self.rows.drain(..) {
            self.arena.release_row(row);
        }
    }

    pub fn is_destroyed(&self) -> bool {
        self.rows.is_empty()
    }

    fn add_scaled(&mut self, s: f32, other: &SparseMat33<'_>) {
        assert_eq!(self.row_count(), other.row_count());
        for (i, row) in other.rows.iter().enumerate() {
            for v in row {
                *self.get_mut(i, v.column as usize) += v.value * s;
            }
        }
    }

    fn add_scaled_diag(&mut self, s: f32, diag: &DiagMat33) {
        assert_eq!(self.row_count(), diag.len());
        for (i, d) in diag.values.iter().enumerate() {
            *self.get_mut(i, i) += *d * s;
        }
    }
}

impl Drop for SparseMat33<'_> {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl Clone for SparseMat33<'_> {
    fn clone(&self) -> Self {
        let mut out = Self::new(self.arena, self.row_count());
        out.copy_from(self);
        out
    }
}

impl std::fmt::Debug for SparseMat33<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SparseMat33")
            .field("rows", &self.row_count())
            .field("nnz", &self.nnz())
            .finish()
    }
}

impl Index<(usize, usize)> for SparseMat33<'_> {
    type Output = Mat3;

    fn index(&self, (i, j): (usize, usize)) -> &Mat3 {
        self.get(i, j)
    }
}

impl IndexMut<(usize, usize)> for SparseMat33<'_> {
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut Mat3 {
        self.get_mut(i, j)
    }
}

impl AddAssign<&SparseMat33<'_>> for SparseMat33<'_> {
    fn add_assign(&mut self, rhs: &SparseMat33<'_>) {
        self.add_scaled(1.0, rhs);
    }
}

impl SubAssign<&SparseMat33<'_>> for SparseMat33<'_> {
    fn sub_assign(&mut self, rhs: &SparseMat33<'_>) {
        self.add_scaled(-1.0, rhs);
    }
}

impl AddAssign<&DiagMat33> for SparseMat33<'_> {
    fn add_assign(&mut self, rhs: &DiagMat33) {
        self.add_scaled_diag(1.0, rhs);
    }
}

impl SubAssign<&DiagMat33> for SparseMat33<'_> {
    fn sub_assign(&mut self, rhs: &DiagMat33) {
        self.add_scaled_diag(-1.0, rhs);
    }
}

impl MulAssign<f32> for SparseMat33<'_> {
    fn mul_assign(&mut self, s: f32) {
        self.scale(s);
    }
}

impl<'a> Add<&SparseMat33<'_>> for &SparseMat33<'a> {
    type Output = SparseMat33<'a>;

    fn add(self, rhs: &SparseMat33<'_>) -> SparseMat33<'a> {
        let mut out = self.clone();
        out += rhs;
        out
    }
}

impl<'a> Sub<&SparseMat33<'_>> for &SparseMat33<'a> {
    type Output = SparseMat33<'a>;

    fn sub(self, rhs: &SparseMat33<'_>) -> SparseMat33<'a> {
        let mut out = self.clone();
        out -= rhs;
        out
    }
}

impl<'a> Add<&DiagMat33> for &SparseMat33<'a> {
    type Output = SparseMat33<'a>;

    fn add(self, rhs: &DiagMat33) -> SparseMat33<'a> {
        let mut out = self.clone();
        out += rhs;
        out
    }
}

impl<'a> Sub<&DiagMat33> for &SparseMat33<'a> {
    type Output = SparseMat33<'a>;

    fn sub(self, rhs: &DiagMat33) -> SparseMat33<'a> {
        let mut out = self.clone();
        out -= rhs;
        out
    }
}

impl<'a> Add<&SparseMat33<'a>> for &DiagMat33 {
    type Output = SparseMat33<'a>;

    fn add(self, rhs: &SparseMat33<'a>) -> SparseMat33<'a> {
        rhs + self
    }
}

impl<'a> Sub<&SparseMat33<'a>> for &DiagMat33 {
    type Output = SparseMat33<'a>;

    fn sub(self, rhs: &SparseMat33<'a>) -> SparseMat33<'a> {
        let mut out = SparseMat33::from_diag(rhs.arena, self);
        out -= rhs;
        out
    }
}

impl<'a> Mul<&SparseMat33<'a>> for f32 {
    type Output = SparseMat33<'a>;

    fn mul(self, rhs: &SparseMat33<'a>) -> SparseMat33<'a> {
        let mut out = rhs.clone();
        out.scale(self);
        out
    }
}

impl Mul<&DenseVec3> for &SparseMat33<'_> {
    type Output = DenseVec3;

    fn mul(self, rhs: &DenseVec3) -> DenseVec3 {
        let mut out = DenseVec3::zeros(self.row_count());
        self.mul_vec(rhs, &mut out);
        out
    }
}
