//! Float 4-momentum vector stored as `(px, py, pz, e)`.

use std::ops::{Add, AddAssign, Sub};

use serde::{Deserialize, Serialize};

/// Lorentz vector with single-precision Cartesian components.
///
/// Derived quantities are computed in `f64` and narrowed on return.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Lv {
    /// x momentum.
    pub px: f32,
    /// y momentum.
    pub py: f32,
    /// z momentum.
    pub pz: f32,
    /// Energy.
    pub e: f32,
}

impl Lv {
    /// Build from Cartesian components.
    pub fn new(px: f32, py: f32, pz: f32, e: f32) -> Self {
        Self { px, py, pz, e }
    }

    /// Build from transverse momentum, pseudorapidity, azimuth and mass.
    pub fn from_pt_eta_phi_m(pt: f32, eta: f32, phi: f32, m: f32) -> Self {
        let (pt, eta, phi, m) = (pt as f64, eta as f64, phi as f64, m as f64);
        let px = pt * phi.cos();
        let py = pt * phi.sin();
        let pz = pt * eta.sinh();
        let p = pt * eta.cosh();
        let e = (p * p + m * m).sqrt();
        Self::new(px as f32, py as f32, pz as f32, e as f32)
    }

    /// Build from transverse momentum, pseudorapidity, azimuth and energy.
    pub fn from_pt_eta_phi_e(pt: f32, eta: f32, phi: f32, e: f32) -> Self {
        let (ptd, etad, phid) = (pt as f64, eta as f64, phi as f64);
        Self::new(
            (ptd * phid.cos()) as f32,
            (ptd * phid.sin()) as f32,
            (ptd * etad.sinh()) as f32,
            e,
        )
    }

    /// Transverse momentum.
    pub fn pt(&self) -> f32 {
        (self.px as f64).hypot(self.py as f64) as f32
    }

    /// Magnitude of the 3-momentum.
    pub fn p(&self) -> f32 {
        let (px, py, pz) = (self.px as f64, self.py as f64, self.pz as f64);
        (px * px + py * py + pz * pz).sqrt() as f32
    }

    /// Pseudorapidity. Infinite along the beam axis, zero for a null vector.
    pub fn eta(&self) -> f32 {
        let pt = (self.px as f64).hypot(self.py as f64);
        let pz = self.pz as f64;
        if pt > 0.0 {
            (pz / pt).asinh() as f32
        } else if pz > 0.0 {
            f32::INFINITY
        } else if pz < 0.0 {
            f32::NEG_INFINITY
        } else {
            0.0
        }
    }

    /// Azimuthal angle in `(-pi, pi]`.
    pub fn phi(&self) -> f32 {
        (self.py as f64).atan2(self.px as f64) as f32
    }

    /// Energy.
    pub fn energy(&self) -> f32 {
        self.e
    }

    /// Invariant mass; negative for space-like vectors.
    pub fn mass(&self) -> f32 {
        let (px, py, pz, e) = (self.px as f64, self.py as f64, self.pz as f64, self.e as f64);
        let m2 = e * e - (px * px + py * py + pz * pz);
        if m2 >= 0.0 { m2.sqrt() as f32 } else { -(-m2).sqrt() as f32 }
    }
}

impl Add for Lv {
    type Output = Lv;

    fn add(self, rhs: Lv) -> Lv {
        Lv::new(self.px + rhs.px, self.py + rhs.py, self.pz + rhs.pz, self.e + rhs.e)
    }
}

impl AddAssign for Lv {
    fn add_assign(&mut self, rhs: Lv) {
        *self = *self + rhs;
    }
}

impl Sub for Lv {
    type Output = Lv;

    fn sub(self, rhs: Lv) -> Lv {
        Lv::new(self.px - rhs.px, self.py - rhs.py, self.pz - rhs.pz, self.e - rhs.e)
    }
}
