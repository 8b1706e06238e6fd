//! Deterministic synthetic member tables for demos, benchmarks and tests.
//!
//! Headers use the accented spellings of the real export so loading exercises
//! header repair. Labels follow simple rules on the features:
//! - `Python` for the technical tracks (IIA, MPI, RT, GL)
//! - `Leadership` for the other tracks, and for any member with a bureau
//!   evaluation of 6 or more

use crate::dataset::FILIERE_VOCABULARY;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fmt::Write;

pub const SYNTHETIC_HEADER: &str = "ID_Membre,Age,Sexe,Moyenne Lycée,Filière,Autres_Clubs,Projets Realisés,Evaluation_Bureau,Soft_Skills,Score_Entretien,Experience_Professionnelle,Indice_Engagement,Cellule,Formations";

const TECH_TRACKS: [&str; 4] = ["IIA", "MPI", "RT", "GL"];
const SOFT_SKILLS: [&str; 3] = ["Moyen", "Bon", "Excellent"];
const CELLS: [&str; 3] = ["Media", "Sponsoring", "Logistique"];

/// Workshops a synthetic member attends, in label order.
pub fn synthetic_labels(filiere: &str, evaluation_bureau: u32) -> Vec<&'static str> {
    let tech = TECH_TRACKS.contains(&filiere);
    let mut labels = Vec::new();
    if !tech || evaluation_bureau >= 6 {
        labels.push("Leadership");
    }
    if tech {
        labels.push("Python");
    }
    labels
}

/// A UTF-8 CSV with `n_rows` labeled members.
///
/// Track, soft skills, interview score and bureau evaluation cycle with the
/// row number so every category occurs in any table of 20 rows or more;
/// the remaining columns are drawn from `seed`. Every ninth row has no cell.
pub fn synthetic_member_csv(n_rows: usize, seed: u64) -> String {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut out = String::from(SYNTHETIC_HEADER);
    for i in 0..n_rows {
        let filiere = FILIERE_VOCABULARY[i % FILIERE_VOCABULARY.len()];
        let evaluation = ((i * 3) % 10) as u32;
        let cell = if i % 9 == 8 {
            ""
        } else {
            CELLS[rng.random_range(0..CELLS.len())]
        };
        let labels = synthetic_labels(filiere, evaluation).join(", ");
        // writing into a String cannot fail
        let _ = write!(
            out,
            "\nM{:03},{},{},{:.1},{},{},{},{},{},{},{},{:.2},{},\"{}\"",
            i + 1,
            rng.random_range(18..26),
            if rng.random_bool(0.5) { "M" } else { "F" },
            rng.random_range(10.0..18.0),
            filiere,
            rng.random_range(0..4),
            rng.random_range(0..6),
            evaluation,
            SOFT_SKILLS[(i / 2) % SOFT_SKILLS.len()],
            6 + (i % 3),
            if i % 4 == 0 { "Oui" } else { "Non" },
            rng.random_range(0.0..1.0),
            cell,
            labels
        );
    }
    out
}
