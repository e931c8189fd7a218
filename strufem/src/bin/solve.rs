//! Solve a model read from JSON and print the solutions as JSON
//!
//! Usage: `strufem-solve [request.json]`, reading stdin when no path is given.
//!
//! ```json
//! {
//!   "model": { ... serialized FEModel ... },
//!   "options": { "solver": "ConjugateGradient" },
//!   "combinations": [{ "name": "1.2DL + 1.6LL", "factors": { "DL": 1.2, "LL": 1.6 } }],
//!   "design_method": "Lrfd"
//! }
//! ```
//!
//! Without combinations or a design method the model's own combination is solved.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::io::Read;

use strufem::prelude::*;

#[derive(Debug, Deserialize)]
struct AnalysisRequest {
    model: FEModel,
    /// Replaces the options stored in the model
    #[serde(default)]
    options: Option<AnalysisOptions>,
    #[serde(default)]
    combinations: Vec<LoadCombination>,
    /// Adds the 16 standard combinations of this method
    #[serde(default)]
    design_method: Option<DesignMethod>,
}

#[derive(Debug, Serialize)]
struct AnalysisResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    results: Vec<Solution>,
}

fn read_request() -> anyhow::Result<AnalysisRequest> {
    let mut json = String::new();
    match std::env::args().nth(1) {
        Some(path) => {
            json = std::fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
        }
        None => {
            std::io::stdin()
                .read_to_string(&mut json)
                .context("reading stdin")?;
        }
    }
    serde_json::from_str(&json).context("parsing analysis request")
}

fn run_analysis(request: AnalysisRequest) -> FEAResult<Vec<Solution>> {
    let mut model = request.model;
    model.validate()?;
    if let Some(options) = request.options {
        model.set_options(options);
    }

    let mut combinations = request.combinations;
    if let Some(method) = request.design_method {
        combinations.extend(LoadCombination::standard(method));
    }
    if combinations.is_empty() {
        combinations.push(model.options().combination.clone());
    }

    log::info!(
        "solving {} nodes, {} elements, {} combinations",
        model.node_count(),
        model.element_count(),
        combinations.len()
    );
    model.solve_combinations(&combinations)
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let request = read_request()?;
    let response = match run_analysis(request) {
        Ok(results) => AnalysisResponse {
            success: true,
            error: None,
            results,
        },
        Err(e) => {
            log::error!("analysis failed: {e}");
            AnalysisResponse {
                success: false,
                error: Some(e.to_string()),
                results: Vec::new(),
            }
        }
    };

    println!("{}", serde_json::to_string_pretty(&response)?);
    if !response.success {
        std::process::exit(1);
    }
    Ok(())
}
