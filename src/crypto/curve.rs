//! Points on the binary curve B-163 (`sect163r2`):
//! `y^2 + xy = x^3 + x^2 + b` over GF(2^163).
//!
//! Affine coordinates throughout. Scalars are plain little-endian limbs and
//! the point at infinity is a distinct variant, never an encoded value.

use super::field::{DEGREE, Gf163};

/// Curve coefficient `b`.
const COEFF_B: Gf163 = Gf163([0x512F_7874_4A32_05FD, 0xB8C9_53CA_1481_EB10, 0x2_0A60_1907]);

/// Base point x coordinate.
const BASE_X: Gf163 = Gf163([0xD499_4637_E834_3E36, 0x86A2_D57E_A099_1168, 0x3_F0EB_A162]);

/// Base point y coordinate.
const BASE_Y: Gf163 = Gf163([0xB11C_5C0C_7973_24F1, 0x71A0_094F_A2CD_D545, 0x0_D51F_BC6C]);

/// Order of the base point.
#[cfg(test)]
pub(crate) const ORDER: [u64; 3] = [0x77E7_0C12_A423_4C33, 0x0000_0000_0002_92FE, 0x4_0000_0000];

/// Point on B-163.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Point {
    /// The identity element.
    Infinity,
    /// A finite point.
    Affine { x: Gf163, y: Gf163 },
}

impl Point {
    pub(crate) const GENERATOR: Point = Point::Affine { x: BASE_X, y: BASE_Y };

    /// Check the curve equation. The identity counts as on the curve.
    pub(crate) fn is_on_curve(&self) -> bool {
        match *self {
            Point::Infinity => true,
            Point::Affine { x, y } => {
                let lhs = y.square().add(x.mul(y));
                let x2 = x.square();
                let rhs = x2.mul(x).add(x2).add(COEFF_B);
                lhs == rhs
            }
        }
    }

    pub(crate) fn double(self) -> Point {
        let Point::Affine { x, y } = self else {
            return Point::Infinity;
        };
        if x.is_zero() {
            return Point::Infinity;
        }
        let lambda = x.add(y.div(x));
        let x3 = lambda.square().add(lambda).add(Gf163::ONE);
        let y3 = x.square().add(lambda.add(Gf163::ONE).mul(x3));
        Point::Affine { x: x3, y: y3 }
    }

    pub(crate) fn add(self, other: Point) -> Point {
        let (x1, y1, x2, y2) = match (self, other) {
            (Point::Infinity, p) | (p, Point::Infinity) => return p,
            (Point::Affine { x: x1, y: y1 }, Point::Affine { x: x2, y: y2 }) => (x1, y1, x2, y2),
        };
        if x1 == x2 {
            return if y1 == y2 { self.double() } else { Point::Infinity };
        }
        let lambda = y1.add(y2).div(x1.add(x2));
        let x3 = lambda.square().add(lambda).add(x1).add(x2).add(Gf163::ONE);
        let y3 = lambda.mul(x1.add(x3)).add(x3).add(y1);
        Point::Affine { x: x3, y: y3 }
    }

    /// Scalar multiplication, double-and-add from the most significant bit.
    pub(crate) fn mul(self, scalar: &[u64; 3]) -> Point {
        let mut acc = Point::Infinity;
        for i in (0..DEGREE).rev() {
            acc = acc.double();
            if (scalar[i / 64] >> (i % 64)) & 1 == 1 {
                acc = acc.add(self);
            }
        }
        acc
    }
}
