use std::fmt;

/// Rational time base: one tick lasts `num / den` seconds.
///
/// Values are kept reduced, so two time bases describing the same tick
/// length compare equal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TimeBase {
    num: u32,
    den: u32,
}

/// Microsecond ticks, used when no exact common time base fits in 32 bits.
pub const MICROSECONDS: TimeBase = TimeBase { num: 1, den: 1_000_000 };

impl TimeBase {
    /// Create a reduced time base.
    ///
    /// Returns `None` if either term is zero.
    pub fn new(num: u32, den: u32) -> Option<Self> {
        if num == 0 || den == 0 {
            return None;
        }
        let g = gcd(num as u64, den as u64) as u32;
        Some(Self { num: num / g, den: den / g })
    }

    /// Time base of one tick per frame at `fps` frames per second.
    pub fn from_frame_rate(fps: FrameRate) -> Option<Self> {
        Self::new(fps.den, fps.num)
    }

    pub fn num(self) -> u32 {
        self.num
    }

    pub fn den(self) -> u32 {
        self.den
    }

    /// Smallest time base into which every one of `bases` converts exactly.
    ///
    /// That is `1 / lcm(den_i)`, since `num/den == num * (L/den) / L`.
    /// Falls back to [`MICROSECONDS`] if the lcm does not fit in a `u32`.
    pub fn common(bases: &[TimeBase]) -> TimeBase {
        let mut lcm: u64 = 1;
        for base in bases {
            let den = base.den as u64;
            lcm = lcm / gcd(lcm, den) * den;
            if lcm > u32::MAX as u64 {
                return MICROSECONDS;
            }
        }
        TimeBase { num: 1, den: lcm as u32 }
    }

    /// Convert `pts` ticks of `self` into ticks of `to`.
    ///
    /// Rounds to nearest, ties away from zero.
    pub fn rescale(self, pts: i64, to: TimeBase) -> i64 {
        let numer = pts as i128 * self.num as i128 * to.den as i128;
        let denom = self.den as i128 * to.num as i128;
        let half = denom / 2;
        let rounded = if numer >= 0 {
            (numer + half) / denom
        } else {
            (numer - half) / denom
        };
        rounded.clamp(i64::MIN as i128, i64::MAX as i128) as i64
    }

    /// Seconds represented by `pts` ticks, for logging.
    pub fn seconds(self, pts: i64) -> f64 {
        pts as f64 * self.num as f64 / self.den as f64
    }
}

impl fmt::Display for TimeBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

/// Frames per second as a rational.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FrameRate {
    pub num: u32,
    pub den: u32,
}

impl FrameRate {
    pub const FPS_25: Self = Self { num: 25, den: 1 };
    pub const FPS_30: Self = Self { num: 30, den: 1 };
    pub const FPS_29_97: Self = Self { num: 30000, den: 1001 };
    pub const FPS_60: Self = Self { num: 60, den: 1 };

    pub fn as_f64(self) -> f64 {
        self.num as f64 / self.den as f64
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}
