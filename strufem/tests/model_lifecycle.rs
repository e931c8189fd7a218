use approx::assert_relative_eq;
use strufem::prelude::*;

/// Two-span continuous beam with a truss brace, loads in dead and live
fn braced_beam() -> (FEModel, [NodeId; 4], [ElementId; 3]) {
    let mut model = FEModel::new();
    let m = model.add_material(Material::steel()).unwrap();
    let beam = model.add_section(Section::rectangular(0.2, 0.4)).unwrap();
    let rod = model.add_section(Section::truss(5e-4)).unwrap();

    let a = model.add_node(Node::new(0.0, 0.0, 0.0)).unwrap();
    let b = model.add_node(Node::new(5.0, 0.0, 0.0)).unwrap();
    let c = model.add_node(Node::new(10.0, 0.0, 0.0)).unwrap();
    let d = model.add_node(Node::new(5.0, -3.0, 0.0)).unwrap();

    let ab = model.add_element(Element::beam(a, b, m, beam)).unwrap();
    let bc = model.add_element(Element::beam(b, c, m, beam)).unwrap();
    let bd = model.add_element(Element::truss(b, d, m, rod)).unwrap();

    model.add_support(a, Support::fixed()).unwrap();
    model.add_support(c, Support::fixed()).unwrap();
    model.add_support(d, Support::pinned()).unwrap();

    model
        .add_load(Load::uniform_downward(ab, 8e3, LoadCase::Dead))
        .unwrap();
    model
        .add_load(Load::uniform_downward(bc, 8e3, LoadCase::Dead))
        .unwrap();
    model
        .add_load(Load::nodal(b, Dof::DZ, -15e3, LoadCase::Live))
        .unwrap();
    (model, [a, b, c, d], [ab, bc, bd])
}

fn assert_same_displacements(a: &Solution, b: &Solution) {
    let scale = a.summary.max_displacement.max(f64::MIN_POSITIVE);
    assert_eq!(a.displacements.len(), b.displacements.len());
    for (node, u) in &a.displacements {
        let v = b.displacement(*node).unwrap();
        for (x, y) in u.as_array().iter().zip(v.as_array()) {
            assert_relative_eq!(*x, y, epsilon = 1e-12 * scale);
        }
    }
}

#[test]
fn model_survives_json_round_trip() {
    let (model, ..) = braced_beam();
    let json = model.to_json().unwrap();
    let restored = FEModel::from_json(&json).unwrap();

    assert_eq!(restored.node_count(), model.node_count());
    assert_eq!(restored.element_count(), model.element_count());
    assert_eq!(restored.load_count(), model.load_count());
    assert_eq!(restored.load_cases(), model.load_cases());

    let before = model.solve().unwrap();
    let after = restored.solve().unwrap();
    assert_same_displacements(&before, &after);
}

#[test]
fn solution_survives_json_round_trip() {
    let (model, nodes, elements) = braced_beam();
    let solution = model.solve().unwrap();

    let json = serde_json::to_string(&solution).unwrap();
    let restored: Solution = serde_json::from_str(&json).unwrap();

    assert_eq!(restored.version, solution.version);
    assert_eq!(restored.combination, solution.combination);
    assert_same_displacements(&solution, &restored);
    assert_relative_eq!(
        restored.reaction(nodes[0]).unwrap().fy,
        solution.reaction(nodes[0]).unwrap().fy,
        max_relative = 1e-12
    );
    assert_eq!(
        restored.element_forces(elements[2]).and_then(|f| f.axial()).is_some(),
        solution.element_forces(elements[2]).and_then(|f| f.axial()).is_some()
    );
    assert_eq!(restored.summary.free_dofs, solution.summary.free_dofs);
}

#[test]
fn mutations_make_results_stale() {
    let (mut model, nodes, _) = braced_beam();
    let solution = model.solve().unwrap();
    assert!(model.is_current(&solution));
    solution.check_current(&model).unwrap();

    model
        .add_load(Load::nodal(nodes[1], Dof::DX, 1e3, LoadCase::Wind))
        .unwrap();
    assert!(!model.is_current(&solution));
    let err = solution.check_current(&model).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Stale);

    // Failed mutations leave the version alone
    let version = model.version();
    assert!(model.add_support(nodes[0], Support::pinned()).is_err());
    assert_eq!(model.version(), version);

    let fresh = model.solve().unwrap();
    assert!(model.is_current(&fresh));
}

#[test]
fn removing_a_node_drops_its_elements_and_loads() {
    let (mut model, nodes, elements) = braced_beam();
    let loads_before = model.load_count();

    // The brace and its support go with node d
    model.remove_node(nodes[3]).unwrap();
    assert_eq!(model.element_count(), 2);
    assert!(model.element(elements[2]).is_none());
    assert!(model.support(nodes[3]).is_none());
    assert_eq!(model.load_count(), loads_before);

    let solution = model.solve().unwrap();
    assert!(solution.displacement(nodes[3]).is_none());
    assert!(solution.summary.equilibrium_residual < 1e-9);

    model.remove_element(elements[0]).unwrap();
    assert_eq!(model.load_count(), loads_before - 1);
    assert!(matches!(
        model.remove_element(elements[0]),
        Err(FEAError::ElementNotFound(id)) if id == elements[0]
    ));
}

#[test]
fn unsupported_model_is_underconstrained() {
    let (mut model, nodes, _) = braced_beam();
    for node in [nodes[0], nodes[2], nodes[3]] {
        model.remove_support(node).unwrap();
    }
    let err = model.solve().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Underconstrained);
    assert!(err.is_instability());
}

#[test]
fn unconnected_node_is_reported() {
    let (mut model, ..) = braced_beam();
    let loose = model.add_node(Node::new(20.0, 20.0, 0.0)).unwrap();

    let err = model.solve().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SingularMatrix);
    assert!(matches!(err, FEAError::SingularMatrix { node, .. } if node == loose));
}

#[test]
fn mechanism_is_reported() {
    // Two trusses in line with a free joint between them
    let mut model = FEModel::new();
    let m = model.add_material(Material::steel()).unwrap();
    let s = model.add_section(Section::truss(1e-3)).unwrap();
    let a = model.add_node(Node::new(0.0, 0.0, 0.0)).unwrap();
    let b = model.add_node(Node::new(1.0, 0.0, 0.0)).unwrap();
    let c = model.add_node(Node::new(2.0, 0.0, 0.0)).unwrap();
    model.add_element(Element::truss(a, b, m, s)).unwrap();
    model.add_element(Element::truss(b, c, m, s)).unwrap();
    model.add_support(a, Support::pinned()).unwrap();
    model.add_support(c, Support::pinned()).unwrap();
    model
        .add_load(Load::nodal(b, Dof::DY, -1e3, LoadCase::Dead))
        .unwrap();

    let err = model.solve().unwrap_err();
    assert!(err.is_instability());
}

#[test]
fn lrfd_combinations_scale_the_dead_case() {
    let (model, nodes, _) = braced_beam();
    let dead = model
        .solve_combination(&LoadCombination::single(LoadCase::Dead))
        .unwrap();
    let live = model
        .solve_combination(&LoadCombination::single(LoadCase::Live))
        .unwrap();
    let combos = LoadCombination::standard(DesignMethod::Lrfd);
    let solutions = model.solve_combinations(&combos).unwrap();
    assert_eq!(solutions.len(), 16);

    // 1.4D
    let b = nodes[1];
    assert_relative_eq!(
        solutions[0].displacement(b).unwrap().dy,
        1.4 * dead.displacement(b).unwrap().dy,
        max_relative = 1e-9
    );
    // 1.2D + 1.6L + 0.5Lr, with no roof live load present
    let picks: [fn(&NodeDisplacement) -> f64; 2] = [|u| u.dy, |u| u.dz];
    for pick in picks {
        assert_relative_eq!(
            pick(solutions[1].displacement(b).unwrap()),
            1.2 * pick(dead.displacement(b).unwrap()) + 1.6 * pick(live.displacement(b).unwrap()),
            epsilon = 1e-9 * solutions[1].summary.max_displacement
        );
    }
    for (solution, combo) in solutions.iter().zip(&combos) {
        assert_eq!(&solution.combination, combo);
        assert!(model.is_current(solution));
    }
}

#[test]
fn options_travel_with_the_model() {
    let (mut model, ..) = braced_beam();
    let version = model.version();
    model.set_options(AnalysisOptions::iterative().with_tolerance(1e-12));
    assert_eq!(model.version(), version + 1);

    let restored = FEModel::from_json(&model.to_json().unwrap()).unwrap();
    assert_eq!(restored.options().solver, SolverKind::ConjugateGradient);

    let solution = restored.solve().unwrap();
    assert!(solution.summary.iterations.is_some());
}

#[test]
fn loads_on_the_same_dof_add_up() {
    let (mut split, nodes, _) = braced_beam();
    let (mut single, ..) = braced_beam();
    let b = nodes[1];

    split
        .add_load(Load::nodal(b, Dof::DX, 4e3, LoadCase::Dead))
        .unwrap();
    split
        .add_load(Load::nodal(b, Dof::DX, 6e3, LoadCase::Dead))
        .unwrap();
    single
        .add_load(Load::nodal(b, Dof::DX, 10e3, LoadCase::Dead))
        .unwrap();

    let a = split.solve().unwrap();
    let c = single.solve().unwrap();
    assert_same_displacements(&a, &c);
    assert_eq!(a.summary.total_load, c.summary.total_load);
}

#[test]
fn edited_json_is_validated_on_load() {
    let (model, ..) = braced_beam();
    let original: serde_json::Value = serde_json::from_str(&model.to_json().unwrap()).unwrap();

    let edits: [(&str, serde_json::Value); 4] = [
        ("/materials/0/e", serde_json::json!(-1.0)),
        ("/elements/0/nodes/1", serde_json::json!(99)),
        ("/elements/0/section", serde_json::json!(7)),
        ("/loads/0/kind", serde_json::json!({ "Pressure": { "p": 1.0 } })),
    ];
    for (pointer, value) in edits {
        let mut edited = original.clone();
        *edited.pointer_mut(pointer).unwrap() = value;
        let err = FEModel::from_json(&edited.to_string()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation, "{pointer}: {err}");
    }

    // A beam folded back onto its first node
    let mut edited = original.clone();
    let first = edited["elements"]["0"]["nodes"][0].clone();
    *edited.pointer_mut("/elements/0/nodes/1").unwrap() = first;
    let err = FEModel::from_json(&edited.to_string()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    // Untouched JSON still loads
    FEModel::from_json(&original.to_string()).unwrap();
}
