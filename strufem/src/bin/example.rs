//! strufem example - simple portal frame under dead and wind load

use anyhow::Context;
use strufem::prelude::*;

fn main() -> anyhow::Result<()> {
    env_logger::init();
    println!("=== strufem example: portal frame ===\n");

    let mut model = FEModel::new();
    let steel = model.add_material(Material::steel())?;

    // W12x26 (approximate properties, SI)
    let w12 = model.add_section(Section::new(0.00494, 8.49e-5, 7.2e-6, 1.25e-7).with_name("W12x26"))?;

    //     N3 -------- N4
    //     |          |
    //     |          |
    //     N1        N2
    //   Fixed     Fixed
    let height = 4.0;
    let span = 6.0;

    let n1 = model.add_node(Node::new(0.0, 0.0, 0.0))?;
    let n2 = model.add_node(Node::new(span, 0.0, 0.0))?;
    let n3 = model.add_node(Node::new(0.0, height, 0.0))?;
    let n4 = model.add_node(Node::new(span, height, 0.0))?;

    let col1 = model.add_element(Element::beam(n1, n3, steel, w12))?;
    let col2 = model.add_element(Element::beam(n2, n4, steel, w12))?;
    let girder = model.add_element(Element::beam(n3, n4, steel, w12))?;

    model.add_support(n1, Support::fixed())?;
    model.add_support(n2, Support::fixed())?;

    // Dead: 20 kN/m on the girder. Wind: 10 kN at roof level.
    model.add_load(Load::uniform_downward(girder, 20e3, LoadCase::Dead))?;
    model.add_load(Load::nodal(n3, Dof::DX, 10e3, LoadCase::Wind))?;

    let combinations = [
        LoadCombination::new("1.4D").with_case(LoadCase::Dead, 1.4),
        LoadCombination::new("1.2D + 1.0W")
            .with_case(LoadCase::Dead, 1.2)
            .with_case(LoadCase::Wind, 1.0),
    ];

    println!("Running linear analysis...\n");
    let solutions = model
        .solve_combinations(&combinations)
        .context("analysis failed")?;

    for solution in &solutions {
        println!("=== Results for {} ===\n", solution.combination.name);

        println!("Node Displacements:");
        for (node, disp) in &solution.displacements {
            println!(
                "  {node}: DX={:.4}mm, DY={:.4}mm, RZ={:.6}rad",
                disp.dx * 1000.0,
                disp.dy * 1000.0,
                disp.rz
            );
        }

        println!("\nSupport Reactions:");
        for (node, rxn) in &solution.reactions {
            println!(
                "  {node}: FX={:.2}kN, FY={:.2}kN, MZ={:.2}kN·m",
                rxn.fx / 1000.0,
                rxn.fy / 1000.0,
                rxn.mz / 1000.0
            );
        }

        println!("\nMember Forces:");
        for (name, id) in [("Col1", col1), ("Col2", col2), ("Girder", girder)] {
            if let Some(ElementForces::Frame { i, j }) = solution.element_forces(id) {
                println!(
                    "  {name}: P={:.2}kN, Vmax={:.2}kN, Mmax={:.2}kN·m",
                    i.axial / 1000.0,
                    i.shear_y.abs().max(j.shear_y.abs()) / 1000.0,
                    i.moment_z.abs().max(j.moment_z.abs()) / 1000.0
                );
            }
        }

        let summary = &solution.summary;
        println!("\nSummary:");
        if let Some(node) = summary.max_displacement_node {
            println!(
                "  Max displacement: {:.4}mm at {node}",
                summary.max_displacement * 1000.0
            );
        }
        if let Some(node) = summary.max_reaction_node {
            println!("  Max reaction: {:.2}kN at {node}", summary.max_reaction / 1000.0);
        }
        println!("  Equilibrium residual: {:.2e}", summary.equilibrium_residual);
        println!(
            "  DOFs: {} total, {} free, {} constrained",
            summary.total_dofs, summary.free_dofs, summary.constrained_dofs
        );
        println!();
    }

    println!("=== Analysis Complete ===");
    Ok(())
}
