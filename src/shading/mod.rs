//! Shading Classification
//!
//! A material is folded into a single integer, the *shading code*, which
//! selects a precompiled shader variant in the engine.
//!
//! # Encoding
//!
//! Six independent axes are treated as mixed-radix digits, lighting being
//! the least significant one:
//!
//! | axis          | variants                              | radix |
//! |---------------|---------------------------------------|-------|
//! | lighting      | shadeless, directional, normal-mapped | 3     |
//! | texturing     | colored, 2d, 3d, cube                 | 4     |
//! | specular      | matte, specular, spec-textured        | 3     |
//! | environment   | none, baked, realtime                 | 3     |
//! | shadowing     | shadowless, caster, full              | 3     |
//! | transparency  | opaque, transparent, cutoff           | 3     |
//!
//! `code = RESERVED_COUNT + Σ ordinalᵢ · Πⱼ<ᵢ radixⱼ`
//!
//! Codes below [`RESERVED_COUNT`] are bootstrap shadings used before any user
//! material exists; they never go through classification.

mod classifier;

pub use classifier::{
    CUBE_FACES, ClassifiedMaterial, PROPERTY_CUTOFF, PROPERTY_TRANSPARENT, TextureResolver, classify,
};

use std::fmt;

use crate::mesh::VertexAttributes;

macro_rules! shading_axis {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident => $label:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Radix of this axis in the composite code.
            pub const COUNT: u64 = Self::ALL.len() as u64;

            #[inline]
            #[must_use]
            pub const fn ordinal(self) -> u64 {
                self as u64
            }

            #[must_use]
            pub fn from_ordinal(ordinal: u64) -> Option<Self> {
                usize::try_from(ordinal).ok().and_then(|i| Self::ALL.get(i).copied())
            }

            /// Upper-case label used in generated shader names.
            #[must_use]
            pub const fn label(self) -> &'static str {
                match self {
                    $(Self::$variant => $label),+
                }
            }
        }
    };
}

shading_axis! {
    /// Bootstrap shadings for internal and debug rendering.
    Reserved {
        WhitePos => "WHITE_POS",
        WhitePosNrm => "WHITE_POS_NRM",
        WhitePosUv => "WHITE_POS_UV",
        WhitePosNrmUv => "WHITE_POS_NRM_UV",
    }
}

shading_axis! {
    Lighting {
        Shadeless => "SHADELESS",
        Directional => "DIRECTIONAL",
        NormalMapped => "NORMALMAPPED",
    }
}

shading_axis! {
    Texturing {
        Colored => "COLORED",
        D2 => "D2",
        D3 => "D3",
        Cube => "CUBE",
    }
}

shading_axis! {
    Specular {
        Matte => "MATTE",
        Specular => "SPECULAR",
        SpecTextured => "SPECTXT",
    }
}

shading_axis! {
    EnvironmentMapping {
        None => "NONE",
        Baked => "BAKED",
        Realtime => "REALTIME",
    }
}

shading_axis! {
    Shadowing {
        Shadowless => "SHADOWLESS",
        Caster => "CASTER",
        Full => "FULL",
    }
}

shading_axis! {
    Transparency {
        Opaque => "OPAQUE",
        Transparent => "TRANSPARENT",
        Cutoff => "CUTOFF",
    }
}

/// Number of bootstrap codes at the bottom of the code space.
pub const RESERVED_COUNT: u64 = Reserved::COUNT;

/// Number of classified shadings (product of all axis radices).
pub const CLASSIFIED_COUNT: u64 = Lighting::COUNT
    * Texturing::COUNT
    * Specular::COUNT
    * EnvironmentMapping::COUNT
    * Shadowing::COUNT
    * Transparency::COUNT;

/// One past the largest valid shading code.
pub const CODE_COUNT: u64 = RESERVED_COUNT + CLASSIFIED_COUNT;

/// Vertex attributes a single axis value asks of the mesh.
pub trait AxisRequirements {
    fn requirements(self) -> VertexAttributes;
}

impl AxisRequirements for Reserved {
    fn requirements(self) -> VertexAttributes {
        match self {
            Self::WhitePos => VertexAttributes::empty(),
            Self::WhitePosNrm => VertexAttributes::NORMAL,
            Self::WhitePosUv => VertexAttributes::UV,
            Self::WhitePosNrmUv => VertexAttributes::NORMAL | VertexAttributes::UV,
        }
    }
}

impl AxisRequirements for Lighting {
    fn requirements(self) -> VertexAttributes {
        match self {
            Self::Shadeless => VertexAttributes::empty(),
            Self::Directional => VertexAttributes::NORMAL,
            Self::NormalMapped => VertexAttributes::NORMAL | VertexAttributes::UV | VertexAttributes::TANGENT,
        }
    }
}

impl AxisRequirements for Texturing {
    fn requirements(self) -> VertexAttributes {
        match self {
            Self::D2 => VertexAttributes::UV,
            Self::Colored | Self::D3 | Self::Cube => VertexAttributes::empty(),
        }
    }
}

impl AxisRequirements for Specular {
    fn requirements(self) -> VertexAttributes {
        match self {
            Self::Matte => VertexAttributes::empty(),
            Self::Specular => VertexAttributes::NORMAL,
            Self::SpecTextured => VertexAttributes::NORMAL | VertexAttributes::UV,
        }
    }
}

impl AxisRequirements for EnvironmentMapping {
    fn requirements(self) -> VertexAttributes {
        match self {
            Self::None => VertexAttributes::empty(),
            Self::Baked | Self::Realtime => VertexAttributes::NORMAL,
        }
    }
}

impl AxisRequirements for Shadowing {
    fn requirements(self) -> VertexAttributes {
        match self {
            Self::Full => VertexAttributes::NORMAL,
            Self::Shadowless | Self::Caster => VertexAttributes::empty(),
        }
    }
}

impl AxisRequirements for Transparency {
    fn requirements(self) -> VertexAttributes {
        match self {
            Self::Cutoff => VertexAttributes::UV,
            Self::Opaque | Self::Transparent => VertexAttributes::empty(),
        }
    }
}

/// The six-axis classification of a user material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShadingAxes {
    pub lighting: Lighting,
    pub texturing: Texturing,
    pub specular: Specular,
    pub environment: EnvironmentMapping,
    pub shadowing: Shadowing,
    pub transparency: Transparency,
}

impl ShadingAxes {
    fn digits(&self) -> [(u64, u64); 6] {
        [
            (self.lighting.ordinal(), Lighting::COUNT),
            (self.texturing.ordinal(), Texturing::COUNT),
            (self.specular.ordinal(), Specular::COUNT),
            (self.environment.ordinal(), EnvironmentMapping::COUNT),
            (self.shadowing.ordinal(), Shadowing::COUNT),
            (self.transparency.ordinal(), Transparency::COUNT),
        ]
    }

    #[must_use]
    pub fn requirements(&self) -> VertexAttributes {
        self.lighting.requirements()
            | self.texturing.requirements()
            | self.specular.requirements()
            | self.environment.requirements()
            | self.shadowing.requirements()
            | self.transparency.requirements()
    }
}

/// A shader variant: either bootstrap or classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shading {
    Reserved(Reserved),
    Classified(ShadingAxes),
}

impl Shading {
    /// Composite integer for this shading.
    #[must_use]
    pub fn code(&self) -> u64 {
        match self {
            Self::Reserved(r) => r.ordinal(),
            Self::Classified(axes) => {
                let mut code = 0;
                let mut weight = 1;
                for (digit, radix) in axes.digits() {
                    code += digit * weight;
                    weight *= radix;
                }
                RESERVED_COUNT + code
            }
        }
    }

    /// Inverse of [`Shading::code`]. Returns `None` outside `0..CODE_COUNT`.
    #[must_use]
    pub fn from_code(code: u64) -> Option<Self> {
        if code < RESERVED_COUNT {
            return Reserved::from_ordinal(code).map(Self::Reserved);
        }
        if code >= CODE_COUNT {
            return None;
        }
        let mut rest = code - RESERVED_COUNT;
        let mut next = |radix: u64| {
            let digit = rest % radix;
            rest /= radix;
            digit
        };
        let lighting = Lighting::from_ordinal(next(Lighting::COUNT))?;
        let texturing = Texturing::from_ordinal(next(Texturing::COUNT))?;
        let specular = Specular::from_ordinal(next(Specular::COUNT))?;
        let environment = EnvironmentMapping::from_ordinal(next(EnvironmentMapping::COUNT))?;
        let shadowing = Shadowing::from_ordinal(next(Shadowing::COUNT))?;
        let transparency = Transparency::from_ordinal(next(Transparency::COUNT))?;
        Some(Self::Classified(ShadingAxes {
            lighting,
            texturing,
            specular,
            environment,
            shadowing,
            transparency,
        }))
    }

    /// Every valid shading, in code order.
    pub fn all() -> impl Iterator<Item = Shading> {
        (0..CODE_COUNT).filter_map(Self::from_code)
    }

    #[must_use]
    pub fn is_reserved(&self) -> bool {
        matches!(self, Self::Reserved(_))
    }

    #[must_use]
    pub fn requirements(&self) -> VertexAttributes {
        match self {
            Self::Reserved(r) => r.requirements(),
            Self::Classified(axes) => axes.requirements(),
        }
    }

    /// Enum-style name, e.g. `DIRECTIONAL_COLORED_MATTE_NONREFLECTIVE_SHADOWLESS_OPAQUE`.
    #[must_use]
    pub fn enum_name(&self) -> String {
        match self {
            Self::Reserved(r) => r.label().to_string(),
            Self::Classified(a) => [
                a.lighting.label(),
                a.texturing.label(),
                a.specular.label(),
                a.environment.label(),
                a.shadowing.label(),
                a.transparency.label(),
            ]
            .join("_"),
        }
    }

    /// Shader source file stem, e.g. `directional-colored-matte-...`.
    #[must_use]
    pub fn file_stem(&self) -> String {
        self.enum_name().to_lowercase().replace('_', "-")
    }
}

impl fmt::Display for Shading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.enum_name(), self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustc_hash::FxHashSet;

    fn every_axes() -> Vec<ShadingAxes> {
        let mut out = Vec::new();
        for &lighting in Lighting::ALL {
            for &texturing in Texturing::ALL {
                for &specular in Specular::ALL {
                    for &environment in EnvironmentMapping::ALL {
                        for &shadowing in Shadowing::ALL {
                            for &transparency in Transparency::ALL {
                                out.push(ShadingAxes {
                                    lighting,
                                    texturing,
                                    specular,
                                    environment,
                                    shadowing,
                                    transparency,
                                });
                            }
                        }
                    }
                }
            }
        }
        out
    }

    #[test]
    fn test_decode_inverts_encode_for_every_tuple() {
        let all = every_axes();
        assert_eq!(all.len() as u64, CLASSIFIED_COUNT);
        for axes in all {
            let shading = Shading::Classified(axes);
            assert_eq!(Shading::from_code(shading.code()), Some(shading));
        }
        for &r in Reserved::ALL {
            assert_eq!(Shading::from_code(r.ordinal()), Some(Shading::Reserved(r)));
        }
    }

    #[test]
    fn test_encode_is_injective_and_disjoint_from_reserved() {
        let mut seen = FxHashSet::default();
        for axes in every_axes() {
            let code = Shading::Classified(axes).code();
            assert!(code >= RESERVED_COUNT && code < CODE_COUNT);
            assert!(seen.insert(code), "code {code} produced twice");
        }
        for &r in Reserved::ALL {
            assert!(seen.insert(Shading::Reserved(r).code()));
        }
        assert_eq!(seen.len() as u64, CODE_COUNT);
    }

    #[test]
    fn test_out_of_range_code() {
        assert_eq!(Shading::from_code(CODE_COUNT), None);
        assert_eq!(Shading::all().count() as u64, CODE_COUNT);
    }

    #[test]
    fn test_lighting_is_least_significant_digit() {
        let base = ShadingAxes {
            lighting: Lighting::Shadeless,
            texturing: Texturing::Colored,
            specular: Specular::Matte,
            environment: EnvironmentMapping::None,
            shadowing: Shadowing::Shadowless,
            transparency: Transparency::Opaque,
        };
        assert_eq!(Shading::Classified(base).code(), RESERVED_COUNT);
        let lit = ShadingAxes {
            lighting: Lighting::Directional,
            ..base
        };
        assert_eq!(Shading::Classified(lit).code(), RESERVED_COUNT + 1);
        let textured = ShadingAxes {
            texturing: Texturing::D2,
            ..base
        };
        assert_eq!(Shading::Classified(textured).code(), RESERVED_COUNT + Lighting::COUNT);
    }

    #[test]
    fn test_requirements_are_or_of_axes() {
        let axes = ShadingAxes {
            lighting: Lighting::Shadeless,
            texturing: Texturing::D2,
            specular: Specular::Matte,
            environment: EnvironmentMapping::None,
            shadowing: Shadowing::Full,
            transparency: Transparency::Opaque,
        };
        assert_eq!(axes.requirements(), VertexAttributes::UV | VertexAttributes::NORMAL);
        assert_eq!(
            Shading::Reserved(Reserved::WhitePos).requirements(),
            VertexAttributes::empty()
        );
    }

    #[test]
    fn test_names() {
        let s = Shading::Reserved(Reserved::WhitePosNrmUv);
        assert_eq!(s.enum_name(), "WHITE_POS_NRM_UV");
        assert_eq!(s.file_stem(), "white-pos-nrm-uv");
    }
}
