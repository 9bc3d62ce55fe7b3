use crate::config::MembraneConfig;
use crate::lammps::{Script, Simulation};
use crate::model::Protein;
use std::path::Path;

const MEMBRANE_TYPE: usize = 1;
const ANCHOR_TYPE: usize = 2;
const BODY_TYPE: usize = 3;
const FIRST_LIGAND_TYPE: usize = 4;

const MEMBRANE_MASS: f64 = 1.0;
const ANCHOR_MASS: f64 = 1.0;

const BOND_K: f64 = 2.0;
const BOND_R0: f64 = 1.3;
const ANGLE_K: f64 = 30.0;
const ANGLE_THETA0: f64 = 180.0;

/// Build the simulation of a protein resting on a linear membrane.
///
/// Anchors sit on lattice sites `0` and `m_length`, membrane particles on the
/// sites in between. The protein body and its ligands form one rigid
/// molecule. The body atom gets the configured `body_mass`, not the protein's
/// own mass. Ligand `k` gets atom type `4 + k` and interacts with the membrane
/// through its own Lennard-Jones parameters.
pub fn build<P: AsRef<Path>>(
    name: &str,
    protein: &Protein,
    cfg: &MembraneConfig,
    out_dir: P,
) -> Simulation {
    let mut sim = Simulation::new(name, out_dir, Script::new(cfg.timestep, cfg.run_steps));
    sim.script.dump = Some(format!("id all xyz {} {name}_out.xyz", cfg.dump_every));

    sim.data.add_mass(MEMBRANE_TYPE, MEMBRANE_MASS);
    sim.data.add_mass(ANCHOR_TYPE, ANCHOR_MASS);
    sim.data.add_mass(BODY_TYPE, cfg.body_mass);
    for (i_lig, ligand) in protein.ligands().iter().enumerate() {
        sim.data.add_mass(FIRST_LIGAND_TYPE + i_lig, ligand.mass);
    }

    add_membrane(&mut sim, cfg);

    let mol = sim.data.new_molecule();
    let body_x = protein.x;
    let body_y = protein.y + cfg.protein_height;
    sim.data.add_atom(BODY_TYPE, [body_x, body_y, 0.0], Some(mol));

    sim.script.add_bond(1, BOND_K, BOND_R0);
    sim.script.add_angle(1, ANGLE_K, ANGLE_THETA0);
    sim.script.add_pair("*", "*", 0.0, 0.0, 0.0);

    let mut protein_types = vec![BODY_TYPE];
    for (i_lig, ligand) in protein.ligands().iter().enumerate() {
        let lig_type = FIRST_LIGAND_TYPE + i_lig;
        let (dx, dy) = ligand.offset();
        sim.data
            .add_atom(lig_type, [body_x + dx, body_y + dy, 0.0], Some(mol));
        sim.script.add_pair(
            &MEMBRANE_TYPE.to_string(),
            &lig_type.to_string(),
            ligand.epsilon,
            ligand.sigma,
            ligand.cutoff,
        );
        protein_types.push(lig_type);
    }

    sim.script.add_group("move", vec![MEMBRANE_TYPE]);
    sim.script.add_group("anchor", vec![ANCHOR_TYPE]);
    sim.script.add_group("protein", protein_types);

    sim.script.add_fix("move", "nve");
    sim.script.add_fix("all", "enforce2d");
    sim.script.add_fix("protein", "rigid/nve molecule");
    sim.script.add_fix("all", "langevin 1 1 1 1000");

    sim
}

fn add_membrane(sim: &mut Simulation, cfg: &MembraneConfig) {
    let start_x = -(cfg.m_length as f64) * cfg.spacing / 2.0;
    let site = |i_site: usize| [start_x + i_site as f64 * cfg.spacing, 0.0, 0.0];

    let first_anchor = sim.data.add_atom(ANCHOR_TYPE, site(0), None);
    let membrane: Vec<_> = (1..cfg.m_length)
        .map(|i_site| sim.data.add_atom(MEMBRANE_TYPE, site(i_site), None))
        .collect();
    let last_anchor = sim.data.add_atom(ANCHOR_TYPE, site(cfg.m_length), None);

    for pair in membrane.windows(2) {
        sim.data.add_bond(1, pair[0], pair[1]);
    }
    for triple in membrane.windows(3) {
        sim.data.add_angle(1, triple[0], triple[1], triple[2]);
    }

    if let (Some(&first), Some(&last)) = (membrane.first(), membrane.last()) {
        sim.data.add_bond(1, first_anchor, first);
        sim.data.add_bond(1, last, last_anchor);
    }
}
