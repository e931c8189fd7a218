//! Linear static analysis: `K U = F` for one or more load combinations

use std::time::Instant;

use super::AnalysisOptions;
use crate::assembly::GlobalSystem;
use crate::dof::DofMap;
use crate::error::{FEAError, FEAResult};
use crate::loads::LoadCombination;
use crate::model::FEModel;
use crate::recovery;
use crate::reduce::Partition;
use crate::results::Solution;
use crate::solver::{PreparedSystem, SolveFailure};

/// A model assembled, reduced and factorized, ready to solve combinations
///
/// Everything that does not depend on the loads is done once in
/// [`LinearStatic::prepare`].
pub struct LinearStatic<'a> {
    model: &'a FEModel,
    options: &'a AnalysisOptions,
    dofs: DofMap,
    system: GlobalSystem,
    partition: Partition,
    solver: PreparedSystem,
}

impl<'a> LinearStatic<'a> {
    pub fn prepare(model: &'a FEModel, options: &'a AnalysisOptions) -> FEAResult<Self> {
        let started = Instant::now();
        let dofs = DofMap::build(model)?;
        let system = GlobalSystem::assemble(model, &dofs, options.parallel)?;
        let partition = Partition::new(&system.k, &dofs, options.suppress_unstiffened_dofs);

        let k_ff = partition.reduced_stiffness(&system.k);
        let solver = PreparedSystem::prepare(k_ff, &options.solver_settings())
            .map_err(|failure| solve_error(failure, &dofs, &partition))?;

        log::debug!(
            "prepared {} free equations of {} in {:?}",
            solver.n(),
            dofs.n_dofs(),
            started.elapsed()
        );
        Ok(Self {
            model,
            options,
            dofs,
            system,
            partition,
            solver,
        })
    }

    pub fn dofs(&self) -> &DofMap {
        &self.dofs
    }

    pub fn system(&self) -> &GlobalSystem {
        &self.system
    }

    pub fn solve(&self, combination: &LoadCombination) -> FEAResult<Solution> {
        let started = Instant::now();
        let loads = self
            .system
            .load_vector(self.model, &self.dofs, combination)?;
        let f_reduced = self
            .partition
            .reduced_load(&self.system.k, &loads.f, &self.dofs)?;

        let solved = self
            .solver
            .solve(&f_reduced)
            .map_err(|failure| solve_error(failure, &self.dofs, &self.partition))?;
        let u = self.partition.expand(&solved.u);

        let displacements = recovery::nodal_displacements(&self.dofs, &u);
        let reactions = recovery::reactions(self.model, &self.dofs, &self.system.k, &loads.f, &u)?;
        let element_forces =
            recovery::element_forces(&self.system, &loads, &u, self.options.parallel)?;

        let mut summary = recovery::summarize(
            self.model,
            &self.dofs,
            &self.partition,
            &loads.f,
            &displacements,
            &reactions,
        );
        summary.iterations = solved.iterations;

        if self.options.check_statics && summary.equilibrium_residual > self.options.statics_tolerance
        {
            log::warn!(
                "'{}': statics check failed, load {:?} vs reaction {:?} (relative residual {:e})",
                combination.name,
                summary.total_load,
                summary.total_reaction,
                summary.equilibrium_residual
            );
        }
        log::info!(
            "solved '{}' in {:?}: max displacement {:e}, equilibrium residual {:e}",
            combination.name,
            started.elapsed(),
            summary.max_displacement,
            summary.equilibrium_residual
        );

        Ok(Solution {
            version: self.model.version(),
            combination: combination.clone(),
            displacements,
            reactions,
            element_forces,
            summary,
        })
    }
}

/// Translate a reduced-system failure into a model-level error
fn solve_error(failure: SolveFailure, dofs: &DofMap, partition: &Partition) -> FEAError {
    match failure {
        SolveFailure::NotConverged {
            iterations,
            residual,
        } => FEAError::ConvergenceFailed {
            iterations,
            residual,
        },
        SolveFailure::Singular { equation, detail } => {
            let location = partition
                .free
                .get(equation)
                .and_then(|&global| dofs.locate(global));
            if partition.constrained.is_empty() {
                return FEAError::Underconstrained(match location {
                    Some((node, dof)) => {
                        format!("no DOF is supported, rigid body motion at {dof} of node {node}")
                    }
                    None => "no DOF is supported".to_string(),
                });
            }
            match location {
                Some((node, dof)) => FEAError::SingularMatrix {
                    node,
                    dof: dof.to_string(),
                    detail,
                },
                None => FEAError::Underconstrained(detail),
            }
        }
    }
}
