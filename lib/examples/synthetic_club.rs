//! Train on a synthetic member table and recommend workshops for one member.
//!
//! Runs the full flow in memory: load, fit the feature pipeline and stacked
//! ensemble, print the evaluation tables, then score a JSON record.
//!
//! ```text
//! cargo run --example synthetic_club
//! ```

use formation_recommender::dataset::synthetic::synthetic_member_csv;
use formation_recommender::dataset::{read_dataset, LoadOptions};
use formation_recommender::trainer::workflow::fit_bundle;
use formation_recommender::trainer::TrainingConfig;
use formation_recommender::Recommender;
use serde_json::json;
use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    let data = read_dataset(synthetic_member_csv(120, 42).as_bytes(), LoadOptions::training())?;
    println!(
        "Loaded {} members ({} dropped)",
        data.report.kept_rows,
        data.report.total_rows - data.report.kept_rows
    );

    let (bundle, report) = fit_bundle(&data, &TrainingConfig::default())?;
    println!("\n{}", report);

    let recommender = Recommender::new(bundle);
    let member = json!({
        "Age": 22,
        "Sexe": "M",
        "Moyenne_Lycée": 16.0,
        "Filière": "IIA",
        "Autres_Clubs": 0,
        "Projets_Realisés": 5,
        "Evaluation_Bureau": 9,
        "Soft_Skills": "Excellent",
        "Score_Entretien": 8,
        "Experience_Professionnelle": "Oui",
        "Indice_Engagement": 0.9
    });

    println!("Recommendations:");
    for rec in recommender.recommend_json(&member, 3)? {
        println!("  {:<12} {:.3}", rec.workshop, rec.confidence);
    }
    Ok(())
}
