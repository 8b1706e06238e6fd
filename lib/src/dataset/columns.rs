//! Column vocabulary of the member table and header repair.
//!
//! Raw exports of the member table went through two incompatible encodings,
//! so headers arrive as e.g. `FiliÃ©re` or `Moyenne Lycée`. [`clean_column_name`]
//! maps every such spelling onto the canonical ASCII names listed here.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Member identifier; kept aside for batch output, never a feature.
pub const ID_COLUMN: &str = "ID_Membre";

/// Raw comma-separated workshop list.
pub const TARGET_COLUMN: &str = "Formations";

/// Academic track; rows outside [`FILIERE_VOCABULARY`] are discarded.
pub const FILIERE_COLUMN: &str = "Filiere";

pub const FILIERE_VOCABULARY: [&str; 7] = ["IIA", "IMI", "MPI", "RT", "GL", "CH", "BIO"];

/// One-hot encoded with the first category dropped.
pub const NOMINAL_COLUMNS: [&str; 4] = ["Sexe", "Filiere", "Experience_Professionnelle", "Cellule"];

/// Rank encoded with a fit-time order.
pub const ORDINAL_COLUMNS: [&str; 2] = ["Soft_Skills", "Score_Entretien"];

/// Min-max scaled to the fit-time range.
pub const NUMERIC_COLUMNS: [&str; 6] = [
    "Age",
    "Moyenne_Lycee",
    "Autres_Clubs",
    "Projets_Realises",
    "Evaluation_Bureau",
    "Indice_Engagement",
];

/// Feature columns a prediction request may omit. An absent optional nominal
/// column encodes as an all-zero indicator group.
pub const OPTIONAL_FEATURE_COLUMNS: [&str; 1] = ["Cellule"];

/// Every feature column, grouped nominal, ordinal, numeric.
pub fn feature_columns() -> impl Iterator<Item = &'static str> {
    NOMINAL_COLUMNS
        .into_iter()
        .chain(ORDINAL_COLUMNS)
        .chain(NUMERIC_COLUMNS)
}

pub fn is_known_filiere(value: &str) -> bool {
    FILIERE_VOCABULARY.contains(&value)
}

/// Repair a raw header into its canonical form.
///
/// Steps: undo the double-encoded `é`, trim and replace spaces with
/// underscores, fold accents, then collapse whitespace and underscore runs
/// into single underscores. Applying it to an already clean name is a no-op.
pub fn clean_column_name(raw: &str) -> String {
    let repaired = raw.replace("Ã©", "é");
    let underscored = repaired.trim().replace(' ', "_");
    let folded: String = underscored
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect();
    folded
        .split(|c: char| c.is_whitespace() || c == '_')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

/// A cleaned name is usable only if the repair left plain ASCII behind.
pub fn is_recoverable(cleaned: &str) -> bool {
    !cleaned.is_empty() && cleaned.is_ascii()
}
