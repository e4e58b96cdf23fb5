use serde::{Deserialize, Serialize};

use super::ModelError;

/// Macro to generate a closed measurement enum with as_str + std::str::FromStr,
/// serialized under the same literal it parses from.
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = ModelError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(ModelError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

str_enum!(Sex {
    Male => "male",
    Female => "female",
});

str_enum!(Regularity {
    Regular => "regular",
    RegularlyIrregular => "regularly_irregular",
    IrregularlyIrregular => "irregularly_irregular",
});

str_enum!(Polarity {
    Positive => "positive",
    Negative => "negative",
    Biphasic => "biphasic",
    Isoelectric => "isoelectric",
});

str_enum!(PMorphology {
    UprightSmooth => "upright_smooth",
    Notched => "notched",
    Biphasic => "biphasic",
    TallPeaked => "tall_peaked",
    Inverted => "inverted",
    Flat => "flat",
});

str_enum!(PrPattern {
    Constant => "constant",
    ProgressivelyLengthening => "progressively_lengthening",
    AbruptlyDropped => "abruptly_dropped",
    Dissociated => "dissociated",
});

str_enum!(QrsShape {
    Qs => "qs",
    SmallRDeepS => "rs_small_r",
    RsrPrime => "rsr_prime",
    MonophasicR => "monophasic_r",
    Qr => "qr",
    DominantR => "dominant_r",
    Equiphasic => "equiphasic",
    Other => "other",
});

str_enum!(StMorphology {
    Concave => "concave",
    Convex => "convex",
    Horizontal => "horizontal",
    Upsloping => "upsloping",
    Downsloping => "downsloping",
});

str_enum!(TMorphology {
    Normal => "normal",
    Peaked => "peaked",
    Flattened => "flattened",
    Biphasic => "biphasic",
    SymmetricInverted => "symmetric_inverted",
});

str_enum!(StBaseline {
    TpSegment => "tp_segment",
    PrSegment => "pr_segment",
});

impl Polarity {
    /// Polarity implied by a signed net amplitude.
    pub fn from_signed(amplitude: f64) -> Self {
        if amplitude > 0.0 {
            Self::Positive
        } else if amplitude < 0.0 {
            Self::Negative
        } else {
            Self::Isoelectric
        }
    }

    /// Whether a signed amplitude is compatible with this polarity.
    /// Biphasic and isoelectric deflections carry no sign constraint.
    pub fn admits(&self, amplitude: f64) -> bool {
        match self {
            Self::Positive => amplitude >= 0.0,
            Self::Negative => amplitude <= 0.0,
            Self::Biphasic | Self::Isoelectric => true,
        }
    }
}

impl QrsShape {
    /// Predominantly negative complexes (QS or small r with deep S).
    pub fn is_predominantly_negative(&self) -> bool {
        matches!(self, Self::Qs | Self::SmallRDeepS)
    }
}

impl StMorphology {
    /// Convex and horizontal elevation are the concerning shapes.
    pub fn is_concerning(&self) -> bool {
        matches!(self, Self::Convex | Self::Horizontal)
    }
}
