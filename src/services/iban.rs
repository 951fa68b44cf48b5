//! Deterministic IBAN generation and IBAN validation.
//!
//! Generation derives every digit from a seeded pseudo-random stream so that
//! the same seed always yields the same IBAN, in every process. The seed is
//! hashed with 32-bit FNV-1a and drives a SplitMix32 generator.

use uuid::Uuid;

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 16_777_619;

pub const MIN_IBAN_LENGTH: usize = 15;
pub const MAX_IBAN_LENGTH: usize = 34;

/// Bank-code and account-number lengths for a country we can generate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountrySpec {
    pub code: &'static str,
    pub bank_code_length: usize,
    pub account_length: usize,
}

impl CountrySpec {
    pub fn bban_length(&self) -> usize {
        self.bank_code_length + self.account_length
    }

    pub fn iban_length(&self) -> usize {
        4 + self.bban_length()
    }
}

/// Countries supported by the generator
pub const GENERATOR_COUNTRIES: &[CountrySpec] = &[
    CountrySpec { code: "DE", bank_code_length: 8, account_length: 10 },
    CountrySpec { code: "AT", bank_code_length: 5, account_length: 11 },
    CountrySpec { code: "PL", bank_code_length: 8, account_length: 16 },
];

/// Registry IBAN lengths used by the validator for countries it knows about
const KNOWN_IBAN_LENGTHS: &[(&str, usize)] = &[
    ("AD", 24), ("AE", 23), ("AL", 28), ("AT", 20), ("AZ", 28), ("BA", 20),
    ("BE", 16), ("BG", 22), ("BH", 22), ("BR", 29), ("CH", 21), ("CY", 28),
    ("CZ", 24), ("DE", 22), ("DK", 18), ("EE", 20), ("ES", 24), ("FI", 18),
    ("FO", 18), ("FR", 27), ("GB", 22), ("GE", 22), ("GI", 23), ("GL", 18),
    ("GR", 27), ("HR", 21), ("HU", 28), ("IE", 22), ("IL", 23), ("IS", 26),
    ("IT", 27), ("KW", 30), ("KZ", 20), ("LB", 28), ("LI", 21), ("LT", 20),
    ("LU", 20), ("LV", 21), ("MC", 27), ("MD", 24), ("ME", 22), ("MK", 19),
    ("MT", 31), ("NL", 18), ("NO", 15), ("PK", 24), ("PL", 28), ("PT", 25),
    ("QA", 29), ("RO", 24), ("RS", 22), ("SA", 24), ("SE", 24), ("SI", 19),
    ("SK", 24), ("SM", 27), ("TN", 24), ("TR", 26), ("UA", 29),
];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IbanError {
    #[error("unsupported country code '{0}'")]
    UnsupportedCountry(String),

    #[error("BBAN must be non-empty and contain only A-Z and 0-9")]
    InvalidBban,
}

/// Why an IBAN failed validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IbanInvalidReason {
    Length,
    CountryCode,
    CheckDigits,
    BbanCharacters,
    CountryLength,
    Checksum,
}

impl IbanInvalidReason {
    pub fn message(&self) -> &'static str {
        match self {
            IbanInvalidReason::Length => "IBAN length must be between 15 and 34 characters",
            IbanInvalidReason::CountryCode => "IBAN must start with a two-letter country code",
            IbanInvalidReason::CheckDigits => "IBAN check digits must be two digits",
            IbanInvalidReason::BbanCharacters => "IBAN may only contain letters and digits",
            IbanInvalidReason::CountryLength => "IBAN length does not match its country",
            IbanInvalidReason::Checksum => "IBAN checksum is invalid",
        }
    }
}

/// Outcome of [`validate_iban`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IbanValidation {
    pub valid: bool,
    pub reason: Option<IbanInvalidReason>,
    /// Normalized form (whitespace removed, uppercased)
    pub normalized: String,
}

impl IbanValidation {
    fn invalid(normalized: String, reason: IbanInvalidReason) -> Self {
        Self {
            valid: false,
            reason: Some(reason),
            normalized,
        }
    }
}

/// 32-bit FNV-1a over the seed's UTF-16 code units
pub fn fnv1a32(input: &str) -> u32 {
    input.encode_utf16().fold(FNV_OFFSET_BASIS, |hash, unit| {
        (hash ^ u32::from(unit)).wrapping_mul(FNV_PRIME)
    })
}

/// SplitMix32 pseudo-random stream
#[derive(Debug, Clone)]
pub struct SplitMix32 {
    state: u32,
}

impl SplitMix32 {
    pub fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    pub fn from_seed_str(seed: &str) -> Self {
        Self::new(fnv1a32(seed))
    }

    pub fn next_u32(&mut self) -> u32 {
        self.state = self.state.wrapping_add(0x9e37_79b9);
        let mut t = self.state ^ (self.state >> 16);
        t = t.wrapping_mul(0x21f0_aaad);
        t ^= t >> 15;
        t = t.wrapping_mul(0x735a_2d97);
        t ^ (t >> 15)
    }

    /// A string of `len` decimal digits, one draw per digit
    pub fn digits(&mut self, len: usize) -> String {
        (0..len)
            .map(|_| char::from(b'0' + (self.next_u32() % 10) as u8))
            .collect()
    }
}

pub fn country_spec(country: &str) -> Option<&'static CountrySpec> {
    GENERATOR_COUNTRIES
        .iter()
        .find(|spec| spec.code.eq_ignore_ascii_case(country))
}

fn known_length(country: &str) -> Option<usize> {
    KNOWN_IBAN_LENGTHS
        .iter()
        .find(|(code, _)| *code == country)
        .map(|(_, len)| *len)
}

/// Remainder of the transliterated string modulo 97
///
/// Letters map to 10..=35. The remainder is folded one decimal digit at a
/// time so arbitrarily long inputs never overflow.
fn mod97(input: &str) -> Option<u32> {
    let mut remainder: u32 = 0;
    for c in input.chars() {
        let value = c.to_digit(36)?;
        if value >= 10 {
            remainder = (remainder * 10 + value / 10) % 97;
            remainder = (remainder * 10 + value % 10) % 97;
        } else {
            remainder = (remainder * 10 + value) % 97;
        }
    }
    Some(remainder)
}

fn is_alphanumeric_upper(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
}

/// Compute the two IBAN check digits for `country` and `bban`
pub fn calculate_check_digits(country: &str, bban: &str) -> Result<String, IbanError> {
    let country = country.to_ascii_uppercase();
    if country.len() != 2 || !country.bytes().all(|b| b.is_ascii_uppercase()) {
        return Err(IbanError::UnsupportedCountry(country));
    }
    let bban = bban.to_ascii_uppercase();
    if !is_alphanumeric_upper(&bban) {
        return Err(IbanError::InvalidBban);
    }

    let rearranged = format!("{bban}{country}00");
    let remainder = mod97(&rearranged).ok_or(IbanError::InvalidBban)?;
    Ok(format!("{:02}", 98 - remainder))
}

/// Generate an IBAN for a supported country
///
/// With a seed the result is fully deterministic; without one a fresh UUID
/// is used as the seed.
pub fn generate_iban(country: &str, seed: Option<&str>) -> Result<String, IbanError> {
    let spec = country_spec(country)
        .ok_or_else(|| IbanError::UnsupportedCountry(country.to_string()))?;

    let generated_seed;
    let seed = match seed {
        Some(seed) => seed,
        None => {
            generated_seed = Uuid::new_v4().to_string();
            &generated_seed
        }
    };

    let mut rng = SplitMix32::from_seed_str(seed);
    let bank_code = rng.digits(spec.bank_code_length);
    let account = rng.digits(spec.account_length);
    let bban = format!("{bank_code}{account}");
    let check = calculate_check_digits(spec.code, &bban)?;

    Ok(format!("{}{check}{bban}", spec.code))
}

/// Strip whitespace and uppercase
pub fn normalize_iban(input: &str) -> String {
    input
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_uppercase()
}

/// Group a normalized IBAN in blocks of four for display
pub fn format_iban(iban: &str) -> String {
    normalize_iban(iban)
        .as_bytes()
        .chunks(4)
        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Validate an IBAN: shape, country length and the mod-97 checksum
pub fn validate_iban(input: &str) -> IbanValidation {
    let iban = normalize_iban(input);

    if !(MIN_IBAN_LENGTH..=MAX_IBAN_LENGTH).contains(&iban.chars().count()) {
        return IbanValidation::invalid(iban, IbanInvalidReason::Length);
    }
    if !iban.is_ascii() {
        return IbanValidation::invalid(iban, IbanInvalidReason::BbanCharacters);
    }

    let (country, rest) = iban.split_at(2);
    let (check, bban) = rest.split_at(2);

    if !country.bytes().all(|b| b.is_ascii_uppercase()) {
        return IbanValidation::invalid(iban, IbanInvalidReason::CountryCode);
    }
    if !check.bytes().all(|b| b.is_ascii_digit()) {
        return IbanValidation::invalid(iban, IbanInvalidReason::CheckDigits);
    }
    if !is_alphanumeric_upper(bban) {
        return IbanValidation::invalid(iban, IbanInvalidReason::BbanCharacters);
    }
    if let Some(expected) = known_length(country)
        && expected != iban.len()
    {
        return IbanValidation::invalid(iban, IbanInvalidReason::CountryLength);
    }

    let rearranged = format!("{bban}{country}{check}");
    if mod97(&rearranged) != Some(1) {
        return IbanValidation::invalid(iban, IbanInvalidReason::Checksum);
    }

    IbanValidation {
        valid: true,
        reason: None,
        normalized: iban,
    }
}
