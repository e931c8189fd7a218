use approx::assert_relative_eq;
use strufem::prelude::*;

fn env_usize(name: &str, default_val: usize) -> usize {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|&v| v > 0)
        .unwrap_or(default_val)
}

/// Structured mesh of an `lx` by `ly` plate in the XY plane at Z=0
struct PlateMesh {
    model: FEModel,
    /// `nodes[j][i]`, i along X, j along Y
    nodes: Vec<Vec<NodeId>>,
    /// `shells[j][i]`
    shells: Vec<Vec<ElementId>>,
}

fn build_plate(lx: f64, ly: f64, nx: usize, ny: usize, material: Material, t: f64) -> PlateMesh {
    let mut model = FEModel::new();
    let m = model.add_material(material).unwrap();
    let s = model.add_section(Section::shell(t)).unwrap();

    let nodes: Vec<Vec<NodeId>> = (0..=ny)
        .map(|j| {
            let y = ly * j as f64 / ny as f64;
            (0..=nx)
                .map(|i| {
                    let x = lx * i as f64 / nx as f64;
                    model.add_node(Node::new(x, y, 0.0)).unwrap()
                })
                .collect()
        })
        .collect();

    // Corners counter-clockwise (bl, br, tr, tl), so local z is global +Z
    let shells = (0..ny)
        .map(|j| {
            (0..nx)
                .map(|i| {
                    let corners = [
                        nodes[j][i],
                        nodes[j][i + 1],
                        nodes[j + 1][i + 1],
                        nodes[j + 1][i],
                    ];
                    model.add_element(Element::shell(corners, m, s)).unwrap()
                })
                .collect()
        })
        .collect();

    PlateMesh {
        model,
        nodes,
        shells,
    }
}

#[test]
fn cantilever_strip_matches_beam_theory() {
    let (length, width, t) = (1.0, 0.2, 0.01);
    let e = 200e9;
    let p = 100.0;
    let nx = 8;

    // nu = 0 keeps the strip free of anticlastic bending
    let material = Material::isotropic(e, 0.0, 7850.0);
    let PlateMesh {
        mut model, nodes, ..
    } = build_plate(length, width, nx, 1, material, t);
    for row in &nodes {
        model.add_support(row[0], Support::fixed()).unwrap();
        model
            .add_load(Load::nodal(row[nx], Dof::DZ, -p / 2.0, LoadCase::Dead))
            .unwrap();
    }

    let solution = model.solve().unwrap();
    let inertia = width * t.powi(3) / 12.0;
    let expected = -p * length.powi(3) / (3.0 * e * inertia);
    for row in &nodes {
        let tip = solution.displacement(row[nx]).unwrap();
        assert_relative_eq!(tip.dz, expected, max_relative = 0.02);
        assert_relative_eq!(tip.dx, 0.0, epsilon = 1e-12);
    }

    let total_fz: f64 = solution.reactions.values().map(|r| r.fz).sum();
    assert_relative_eq!(total_fz, p, max_relative = 1e-9);
    assert!(solution.summary.equilibrium_residual < 1e-9);
}

#[test]
fn simply_supported_plate_matches_navier_solution() {
    let (a, t) = (1.0, 0.01);
    let (e, nu) = (200e9, 0.3);
    let q = 1000.0;
    let n = env_usize("STRUFEM_PLATE_MESH_N", 8);

    let PlateMesh {
        mut model,
        nodes,
        shells,
    } = build_plate(a, a, n, n, Material::isotropic(e, nu, 7850.0), t);

    for j in 0..=n {
        for i in 0..=n {
            if i != 0 && i != n && j != 0 && j != n {
                continue;
            }
            // Edges hold w; two corners remove the in-plane rigid body modes
            let flags = match (i, j) {
                (0, 0) => [true, true, true, false, false, false],
                (i, 0) if i == n => [false, true, true, false, false, false],
                _ => [false, false, true, false, false, false],
            };
            model
                .add_support(nodes[j][i], Support::from_flags(flags))
                .unwrap();
        }
    }
    for row in &shells {
        for &shell in row {
            model
                .add_load(Load::pressure(shell, -q, LoadCase::Dead))
                .unwrap();
        }
    }

    let solution = model.solve().unwrap();

    // Kirchhoff: w_max = 0.00406 q a^4 / D
    let d = e * t.powi(3) / (12.0 * (1.0 - nu * nu));
    let w_navier = 0.00406235 * q * a.powi(4) / d;
    let centre = solution.displacement(nodes[n / 2][n / 2]).unwrap();
    assert_relative_eq!(-centre.dz, w_navier, max_relative = 0.03);
    assert_relative_eq!(solution.summary.max_displacement, -centre.dz, max_relative = 1e-9);

    assert_relative_eq!(solution.summary.total_reaction[2], q * a * a, max_relative = 1e-9);
    assert!(solution.summary.equilibrium_residual < 1e-9);

    // Pure bending: no membrane stress, surfaces mirror each other
    let Some(ElementForces::Shell(stress)) = solution.element_forces(shells[n / 2][n / 2]) else {
        panic!("shell should report shell stresses");
    };
    let scale = stress.max_von_mises();
    assert!(scale > 0.0);
    assert!(stress.membrane.von_mises < 1e-6 * scale);
    assert_relative_eq!(stress.top.sx, -stress.bottom.sx, epsilon = 1e-6 * scale);
    // Both directions sag the same way
    assert!(stress.mx * stress.my > 0.0);
}

fn build_pinned_corners_plate_model(nx: usize, ny: usize) -> PlateMesh {
    // Plate size: 2m x 1m, 10 mm steel, 1 kPa
    let mut mesh = build_plate(2.0, 1.0, nx, ny, Material::isotropic(200e9, 0.27, 7850.0), 0.01);
    let corners = [
        mesh.nodes[0][0],
        mesh.nodes[0][nx],
        mesh.nodes[ny][nx],
        mesh.nodes[ny][0],
    ];
    for corner in corners {
        mesh.model.add_support(corner, Support::pinned()).unwrap();
    }
    for row in &mesh.shells {
        for &shell in row {
            mesh.model
                .add_load(Load::pressure(shell, -1000.0, LoadCase::Dead))
                .unwrap();
        }
    }
    mesh
}

#[test]
fn von_mises_plate_pinned_corners_sanity() {
    // Mesh density is controllable so you can match a commercial FEA mesh.
    // Both counts must be even so nodes sit at the centre and edge midspans.
    let nx = 2 * env_usize("STRUFEM_PLATE_HALF_NX", 5);
    let ny = 2 * env_usize("STRUFEM_PLATE_HALF_NY", 3);

    let mesh = build_pinned_corners_plate_model(nx, ny);
    let solution = mesh.model.solve().unwrap();

    let mut max_vm = 0.0_f64;
    for row in &mesh.shells {
        for shell in row {
            let Some(ElementForces::Shell(s)) = solution.element_forces(*shell) else {
                panic!("shell {shell} has no stress result");
            };
            assert!(s.max_von_mises().is_finite(), "von Mises should be finite");
            max_vm = max_vm.max(s.max_von_mises());
        }
    }
    assert!(max_vm > 0.0, "von Mises should be > 0 for loaded plate");

    // Double symmetry: every corner carries a quarter of the load
    let total = 1000.0 * 2.0 * 1.0;
    for corner in [
        mesh.nodes[0][0],
        mesh.nodes[0][nx],
        mesh.nodes[ny][nx],
        mesh.nodes[ny][0],
    ] {
        assert_relative_eq!(solution.reaction(corner).unwrap().fz, total / 4.0, max_relative = 1e-6);
    }

    // The free long edges sag past the centre at midspan
    let centre = solution.displacement(mesh.nodes[ny / 2][nx / 2]).unwrap();
    let edge = solution.displacement(mesh.nodes[0][nx / 2]).unwrap();
    assert!(centre.dz < 0.0);
    assert!(edge.dz < centre.dz);
    assert_relative_eq!(
        edge.dz,
        solution.displacement(mesh.nodes[ny][nx / 2]).unwrap().dz,
        max_relative = 1e-9
    );
    assert!(solution.summary.max_displacement >= -edge.dz);

    // Run with: cargo test von_mises_plate_pinned_corners_sanity -- --nocapture
    eprintln!("Pinned-corners plate von Mises test");
    eprintln!("  mesh: nx={nx}, ny={ny} (elements={})", nx * ny);
    eprintln!("  max von Mises: {:.6} MPa", max_vm / 1e6);
    eprintln!("  centre Z deflection: {:.6} mm", centre.dz * 1000.0);
    eprintln!("  edge midspan Z deflection: {:.6} mm", edge.dz * 1000.0);
}

#[test]
#[ignore]
fn von_mises_plate_pinned_corners_report_csv() {
    // Run with:
    //   cargo test von_mises_plate_pinned_corners_report_csv -- --ignored --nocapture
    let nx = 2 * env_usize("STRUFEM_PLATE_HALF_NX", 5);
    let ny = 2 * env_usize("STRUFEM_PLATE_HALF_NY", 3);

    let mesh = build_pinned_corners_plate_model(nx, ny);
    let solution = mesh.model.solve().unwrap();

    println!("shell,i,j,von_mises_mpa,sx_top_mpa,sy_top_mpa,txy_top_mpa,mx,my,mxy");
    for (j, row) in mesh.shells.iter().enumerate() {
        for (i, shell) in row.iter().enumerate() {
            if let Some(ElementForces::Shell(s)) = solution.element_forces(*shell) {
                println!(
                    "{shell},{i},{j},{:.6},{:.6},{:.6},{:.6},{:.6},{:.6},{:.6}",
                    s.max_von_mises() / 1e6,
                    s.top.sx / 1e6,
                    s.top.sy / 1e6,
                    s.top.txy / 1e6,
                    s.mx,
                    s.my,
                    s.mxy
                );
            }
        }
    }
}
