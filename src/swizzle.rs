use std::{str::FromStr, sync::Arc};

use casey::snake;
use derive_more::{Deref, Display, From, Into};
use itertools::Itertools;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SwizzleError {
    #[error("swizzle lane error: unknown lane '{0}'")]
    Lane(char),
    #[error("swizzle length error: {0} lanes (expect 1 to 4)")]
    Length(usize),
}

/// A vector lane, addressable by position or by color alias.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Lane {
    #[default]
    #[display("x")]
    X,
    #[display("y")]
    Y,
    #[display("z")]
    Z,
    #[display("w")]
    W,
}

impl Lane {
    pub const fn index(self) -> usize {
        match self {
            Self::X => 0,
            Self::Y => 1,
            Self::Z => 2,
            Self::W => 3,
        }
    }

    /// Accepts both positional (`xyzw`) and color (`rgba`) lane names.
    pub const fn from_char(value: char) -> Option<Self> {
        match value {
            'x' | 'r' => Some(Self::X),
            'y' | 'g' => Some(Self::Y),
            'z' | 'b' => Some(Self::Z),
            'w' | 'a' => Some(Self::W),
            _ => None,
        }
    }
}

/// An ordered lane selection, e.g. `wzyx`. Reads produce a reordered vector;
/// writes assign back only the selected lanes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deref, From, Into, Display)]
#[display("{}", _0.iter().format(""))]
pub struct Swizzle(Arc<[Lane]>);

impl From<Vec<Lane>> for Swizzle {
    #[inline]
    fn from(value: Vec<Lane>) -> Self {
        Self(value.into())
    }
}

macro_rules! impl_swizzle_from {
    ($t:ident) => {
        impl<$t: Into<Lane>> From<$t> for Swizzle {
            #[inline]
            fn from(snake!($t): $t) -> Self {
                Self([snake!($t).into()].into())
            }
        }
    };
    ($($t:ident),+) => {
        impl<$($t),+> From<($($t),+)> for Swizzle
        where
            $($t: Into<Lane>),+
        {
            #[inline]
            fn from(($(snake!($t)),+): ($($t),+)) -> Self {
                Self([$(snake!($t).into()),+].into())
            }
        }
    };
}

impl_swizzle_from!(T0);
impl_swizzle_from!(T0, T1);
impl_swizzle_from!(T0, T1, T2);
impl_swizzle_from!(T0, T1, T2, T3);

impl FromStr for Swizzle {
    type Err = SwizzleError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let lanes: Vec<Lane> = value
            .chars()
            .map(|c| Lane::from_char(c).ok_or(SwizzleError::Lane(c)))
            .try_collect()?;
        match lanes.len() {
            1..=4 => Ok(lanes.into()),
            len => Err(SwizzleError::Length(len)),
        }
    }
}

impl Swizzle {
    /// The highest lane position the swizzle touches.
    #[inline]
    pub fn max_lane(&self) -> usize {
        self.iter().map(|lane| lane.index()).max().unwrap_or(0)
    }

    /// Returns `true` if the swizzle selects every lane in order, `xyzw`-style.
    #[inline]
    pub fn is_identity(&self) -> bool {
        self.iter().enumerate().all(|(i, lane)| lane.index() == i)
    }

    /// Returns `true` if a lane appears more than once.
    #[inline]
    pub fn has_duplicates(&self) -> bool {
        !self.iter().all_unique()
    }
}
