//! Spectral designation parsing (`G2V`, `B1Ia`, `DA3`, ...).

use serde::{Deserialize, Serialize};

/// Harvard spectral letter. `D` covers white dwarfs (`DA`, `DB`, `DC`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SpectralClass {
    O,
    B,
    A,
    F,
    G,
    K,
    M,
    D,
}

impl SpectralClass {
    pub fn parse(designation: &str) -> Option<Self> {
        let letter = designation.trim().chars().next()?.to_ascii_uppercase();
        match letter {
            'O' => Some(SpectralClass::O),
            'B' => Some(SpectralClass::B),
            'A' => Some(SpectralClass::A),
            'F' => Some(SpectralClass::F),
            'G' => Some(SpectralClass::G),
            'K' => Some(SpectralClass::K),
            'M' => Some(SpectralClass::M),
            'D' => Some(SpectralClass::D),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LuminosityClass {
    Supergiant,
    BrightGiant,
    Giant,
    Subgiant,
    MainSequence,
    WhiteDwarf,
}

impl LuminosityClass {
    /// Reads the Yerkes suffix after the letter and subtype digits.
    /// Returns `None` when the designation carries no suffix.
    pub fn parse(designation: &str) -> Option<Self> {
        let trimmed = designation.trim();
        if trimmed.starts_with(['D', 'd']) {
            return Some(LuminosityClass::WhiteDwarf);
        }
        let suffix: String = trimmed
            .chars()
            .filter(|c| !c.is_whitespace())
            .skip(1)
            .skip_while(|c| c.is_ascii_digit() || *c == '.')
            .take_while(|c| matches!(c, 'I' | 'V' | 'a' | 'b' | '0'))
            .collect();
        match suffix.as_str() {
            "0" | "Ia" | "Iab" | "Ib" | "I" | "Ia0" => Some(LuminosityClass::Supergiant),
            "II" | "IIa" | "IIb" => Some(LuminosityClass::BrightGiant),
            "III" | "IIIa" | "IIIb" => Some(LuminosityClass::Giant),
            "IV" | "IVa" | "IVb" => Some(LuminosityClass::Subgiant),
            "V" | "Va" | "Vb" | "VI" => Some(LuminosityClass::MainSequence),
            _ => None,
        }
    }

    /// Fallback classification from radius (solar radii).
    pub fn infer_from_radius(radius: f64) -> Self {
        if radius >= 100.0 {
            LuminosityClass::Supergiant
        } else if radius >= 10.0 {
            LuminosityClass::Giant
        } else if radius < 0.05 {
            LuminosityClass::WhiteDwarf
        } else {
            LuminosityClass::MainSequence
        }
    }

    /// Giant-branch classes, bright giants included.
    pub fn is_giant(self) -> bool {
        matches!(self, LuminosityClass::Giant | LuminosityClass::BrightGiant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_letter_case_insensitively() {
        assert_eq!(SpectralClass::parse("G2V"), Some(SpectralClass::G));
        assert_eq!(SpectralClass::parse("m5.5V"), Some(SpectralClass::M));
        assert_eq!(SpectralClass::parse("DA3"), Some(SpectralClass::D));
        assert_eq!(SpectralClass::parse("X1"), None);
        assert_eq!(SpectralClass::parse(""), None);
    }

    #[test]
    fn parses_luminosity_suffix() {
        assert_eq!(LuminosityClass::parse("G2V"), Some(LuminosityClass::MainSequence));
        assert_eq!(LuminosityClass::parse("B1Ia"), Some(LuminosityClass::Supergiant));
        assert_eq!(LuminosityClass::parse("K0III"), Some(LuminosityClass::Giant));
        assert_eq!(LuminosityClass::parse("F5IV"), Some(LuminosityClass::Subgiant));
        assert_eq!(LuminosityClass::parse("M3.5II"), Some(LuminosityClass::BrightGiant));
        assert_eq!(LuminosityClass::parse("DA2"), Some(LuminosityClass::WhiteDwarf));
        assert_eq!(LuminosityClass::parse("G2"), None);
    }

    #[test]
    fn infers_from_radius_when_suffix_missing() {
        assert_eq!(LuminosityClass::infer_from_radius(300.0), LuminosityClass::Supergiant);
        assert_eq!(LuminosityClass::infer_from_radius(20.0), LuminosityClass::Giant);
        assert_eq!(LuminosityClass::infer_from_radius(1.0), LuminosityClass::MainSequence);
        assert_eq!(LuminosityClass::infer_from_radius(0.01), LuminosityClass::WhiteDwarf);
    }
}
