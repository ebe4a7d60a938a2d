use crate::error::OrbOptError;
use crate::orbital_space::{OrbitalClass, OrbitalSpace, RotationIndex};

fn pairs(indices: &[RotationIndex]) -> Vec<(usize, usize)> {
    indices.iter().map(|pq| (pq.p, pq.q)).collect()
}

#[test]
fn test_orbital_space_all_active() {
    let space = OrbitalSpace::all_active(4);
    assert_eq!(space.n_orbs(), 4);
    assert_eq!(space.count(OrbitalClass::Active), 4);
    assert_eq!(
        pairs(&space.parameter_indices()),
        vec![(0, 1), (0, 2), (0, 3), (1, 2), (1, 3), (2, 3)]
    );
    assert_eq!(space.mixing_blocks(), vec![vec![0, 1, 2, 3]]);
}

#[test]
fn test_orbital_space_casscf_partitioning() {
    // frozen | core core | active active | virtual
    let space = OrbitalSpace::from_counts(1, 2, 2, 1, false);
    assert_eq!(space.n_orbs(), 6);
    assert_eq!(
        space.classes(),
        &[
            OrbitalClass::Frozen,
            OrbitalClass::Core,
            OrbitalClass::Core,
            OrbitalClass::Active,
            OrbitalClass::Active,
            OrbitalClass::Virtual,
        ]
    );

    assert!(space.is_redundant(0, 3));
    assert!(space.is_redundant(1, 2));
    assert!(space.is_redundant(3, 4));
    assert!(!space.is_redundant(1, 3));
    assert!(!space.is_redundant(5, 2));

    assert_eq!(
        pairs(&space.parameter_indices()),
        vec![
            (1, 3),
            (1, 4),
            (1, 5),
            (2, 3),
            (2, 4),
            (2, 5),
            (3, 5),
            (4, 5)
        ]
    );

    let space_aa = OrbitalSpace::from_counts(1, 2, 2, 1, true);
    assert!(pairs(&space_aa.parameter_indices()).contains(&(3, 4)));
    assert_eq!(space_aa.parameter_indices().len(), 9);

    assert_eq!(space.mixing_blocks(), vec![vec![1, 2, 3, 4, 5]]);
}

#[test]
fn test_orbital_space_irreps() {
    let space = OrbitalSpace::from_counts(0, 1, 2, 1, true)
        .with_irreps(vec![0, 1, 0, 1])
        .unwrap();
    assert_eq!(space.irreps(), &[0, 1, 0, 1]);
    assert_eq!(pairs(&space.parameter_indices()), vec![(0, 2), (1, 3)]);
    assert_eq!(space.mixing_blocks(), vec![vec![0, 2], vec![1, 3]]);

    let err = OrbitalSpace::all_active(3)
        .with_irreps(vec![0, 0])
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<OrbOptError>(),
        Some(OrbOptError::DimensionMismatch(_))
    ));
}

#[test]
fn test_orbital_space_builder() {
    let space = OrbitalSpace::builder()
        .classes(vec![
            OrbitalClass::Core,
            OrbitalClass::Active,
            OrbitalClass::Virtual,
        ])
        .build()
        .unwrap();
    assert_eq!(space.irreps(), &[0, 0, 0]);
    assert_eq!(pairs(&space.parameter_indices()), vec![(0, 1), (0, 2), (1, 2)]);

    assert!(OrbitalSpace::builder()
        .classes(vec![OrbitalClass::Active; 2])
        .irreps(vec![0])
        .build()
        .is_err());
    assert!(OrbitalSpace::builder().build().is_err());
}

#[test]
fn test_orbital_space_yaml() {
    let space: OrbitalSpace =
        serde_yaml::from_str("classes: [Core, Active, Active, Virtual]\n").unwrap();
    assert_eq!(space, OrbitalSpace::from_counts(0, 1, 2, 1, true));

    let space: OrbitalSpace = serde_yaml::from_str(
        "classes: [Active, Active]\nirreps: [0, 1]\nactive_active_rotations: false\n",
    )
    .unwrap();
    assert_eq!(space.irreps(), &[0, 1]);
    assert!(space.parameter_indices().is_empty());

    let yaml = serde_yaml::to_string(&space).unwrap();
    assert_eq!(serde_yaml::from_str::<OrbitalSpace>(&yaml).unwrap(), space);

    assert!(serde_yaml::from_str::<OrbitalSpace>(
        "classes: [Core, Active, Virtual]\nirreps: [0, 0]\n"
    )
    .is_err());
}

#[test]
fn test_orbital_space_rotation_index() {
    let pq = RotationIndex::new(3, 1).unwrap();
    assert_eq!((pq.p, pq.q), (1, 3));
    assert_eq!(pq.to_string(), "(1, 3)");
    assert!(RotationIndex::new(2, 2).is_err());
}

#[test]
fn test_orbital_space_empty() {
    let space = OrbitalSpace::from_counts(0, 2, 0, 0, true);
    assert!(space.parameter_indices().is_empty());
}
