//! Minimal writer for LAMMPS data files and input scripts.

use anyhow::{Context, Result};
use std::{
    collections::BTreeMap,
    fs::File,
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};

#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    pub id: usize,
    /// Molecule id, 0 when the atom belongs to no molecule.
    pub mol: usize,
    pub atom_type: usize,
    pub pos: [f64; 3],
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bond {
    pub bond_type: usize,
    pub atoms: [usize; 2],
}

#[derive(Debug, Clone, PartialEq)]
pub struct Angle {
    pub angle_type: usize,
    pub atoms: [usize; 3],
}

/// Structural part of a simulation: masses, atoms, bonds and angles.
///
/// Atom and molecule ids start at 1.
#[derive(Debug, Default)]
pub struct DataFile {
    masses: BTreeMap<usize, f64>,
    atoms: Vec<Atom>,
    bonds: Vec<Bond>,
    angles: Vec<Angle>,
    n_mols: usize,
}

impl DataFile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_mass(&mut self, atom_type: usize, mass: f64) {
        self.masses.insert(atom_type, mass);
    }

    /// Reserve a fresh molecule id.
    pub fn new_molecule(&mut self) -> usize {
        self.n_mols += 1;
        self.n_mols
    }

    /// Add an atom and return its id.
    pub fn add_atom(&mut self, atom_type: usize, pos: [f64; 3], mol: Option<usize>) -> usize {
        let id = self.atoms.len() + 1;
        self.atoms.push(Atom {
            id,
            mol: mol.unwrap_or(0),
            atom_type,
            pos,
        });
        id
    }

    pub fn add_bond(&mut self, bond_type: usize, a: usize, b: usize) {
        self.bonds.push(Bond {
            bond_type,
            atoms: [a, b],
        });
    }

    pub fn add_angle(&mut self, angle_type: usize, a: usize, b: usize, c: usize) {
        self.angles.push(Angle {
            angle_type,
            atoms: [a, b, c],
        });
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    pub fn bonds(&self) -> &[Bond] {
        &self.bonds
    }

    pub fn angles(&self) -> &[Angle] {
        &self.angles
    }

    #[cfg(test)]
    pub fn mass(&self, atom_type: usize) -> Option<f64> {
        self.masses.get(&atom_type).copied()
    }

    fn n_atom_types(&self) -> usize {
        let max_atom = self.atoms.iter().map(|atom| atom.atom_type).max();
        let max_mass = self.masses.keys().next_back().copied();
        max_atom.max(max_mass).unwrap_or(0)
    }

    fn n_bond_types(&self) -> usize {
        self.bonds.iter().map(|bond| bond.bond_type).max().unwrap_or(0)
    }

    fn n_angle_types(&self) -> usize {
        self.angles.iter().map(|angle| angle.angle_type).max().unwrap_or(0)
    }

    /// Box bounds enclosing every atom with a margin.
    fn bounds(&self) -> [[f64; 2]; 3] {
        const MARGIN: f64 = 5.0;
        let mut bounds = [[-0.5, 0.5]; 3];
        for dim in 0..2 {
            let coords = self.atoms.iter().map(|atom| atom.pos[dim]);
            let lo = coords.clone().fold(f64::INFINITY, f64::min);
            let hi = coords.fold(f64::NEG_INFINITY, f64::max);
            if lo.is_finite() && hi.is_finite() {
                bounds[dim] = [lo - MARGIN, hi + MARGIN];
            }
        }
        bounds
    }

    pub fn write_to(&self, writer: &mut impl Write) -> io::Result<()> {
        writeln!(writer, "LAMMPS data file")?;
        writeln!(writer)?;
        writeln!(writer, "{} atoms", self.atoms.len())?;
        writeln!(writer, "{} bonds", self.bonds.len())?;
        writeln!(writer, "{} angles", self.angles.len())?;
        writeln!(writer)?;
        writeln!(writer, "{} atom types", self.n_atom_types())?;
        writeln!(writer, "{} bond types", self.n_bond_types())?;
        writeln!(writer, "{} angle types", self.n_angle_types())?;
        writeln!(writer)?;

        for ([lo, hi], axis) in self.bounds().into_iter().zip(["x", "y", "z"]) {
            writeln!(writer, "{lo} {hi} {axis}lo {axis}hi")?;
        }

        if !self.masses.is_empty() {
            writeln!(writer, "\nMasses\n")?;
            for (atom_type, mass) in &self.masses {
                writeln!(writer, "{atom_type} {mass}")?;
            }
        }

        if !self.atoms.is_empty() {
            writeln!(writer, "\nAtoms # molecular\n")?;
            for atom in &self.atoms {
                let [x, y, z] = atom.pos;
                writeln!(writer, "{} {} {} {x} {y} {z}", atom.id, atom.mol, atom.atom_type)?;
            }
        }

        if !self.bonds.is_empty() {
            writeln!(writer, "\nBonds\n")?;
            for (i_bond, bond) in self.bonds.iter().enumerate() {
                let [a, b] = bond.atoms;
                writeln!(writer, "{} {} {a} {b}", i_bond + 1, bond.bond_type)?;
            }
        }

        if !self.angles.is_empty() {
            writeln!(writer, "\nAngles\n")?;
            for (i_angle, angle) in self.angles.iter().enumerate() {
                let [a, b, c] = angle.atoms;
                writeln!(writer, "{} {} {a} {b} {c}", i_angle + 1, angle.angle_type)?;
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PairCoeff {
    pub types: [String; 2],
    pub epsilon: f64,
    pub sigma: f64,
    pub cutoff: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Fix {
    pub group: String,
    pub style: String,
}

/// Control part of a simulation: force field, groups, fixes and run length.
#[derive(Debug)]
pub struct Script {
    pub dump: Option<String>,
    pub timestep: f64,
    pub run_steps: usize,
    bond_coeffs: BTreeMap<usize, [f64; 2]>,
    angle_coeffs: BTreeMap<usize, [f64; 2]>,
    pairs: Vec<PairCoeff>,
    groups: Vec<(String, Vec<usize>)>,
    fixes: Vec<Fix>,
}

impl Script {
    pub fn new(timestep: f64, run_steps: usize) -> Self {
        Self {
            dump: None,
            timestep,
            run_steps,
            bond_coeffs: BTreeMap::new(),
            angle_coeffs: BTreeMap::new(),
            pairs: Vec::new(),
            groups: Vec::new(),
            fixes: Vec::new(),
        }
    }

    /// Harmonic bond with stiffness `k` and rest length `r0`.
    pub fn add_bond(&mut self, bond_type: usize, k: f64, r0: f64) {
        self.bond_coeffs.insert(bond_type, [k, r0]);
    }

    /// Harmonic angle with stiffness `k` and rest angle `theta0` (degrees).
    pub fn add_angle(&mut self, angle_type: usize, k: f64, theta0: f64) {
        self.angle_coeffs.insert(angle_type, [k, theta0]);
    }

    /// Lennard-Jones interaction between two atom types (`*` for all).
    pub fn add_pair(&mut self, type_a: &str, type_b: &str, epsilon: f64, sigma: f64, cutoff: f64) {
        self.pairs.push(PairCoeff {
            types: [type_a.to_string(), type_b.to_string()],
            epsilon,
            sigma,
            cutoff,
        });
    }

    pub fn add_group(&mut self, name: &str, atom_types: Vec<usize>) {
        self.groups.push((name.to_string(), atom_types));
    }

    pub fn add_fix(&mut self, group: &str, style: &str) {
        self.fixes.push(Fix {
            group: group.to_string(),
            style: style.to_string(),
        });
    }

    #[cfg(test)]
    pub fn pairs(&self) -> &[PairCoeff] {
        &self.pairs
    }

    #[cfg(test)]
    pub fn groups(&self) -> &[(String, Vec<usize>)] {
        &self.groups
    }

    #[cfg(test)]
    pub fn fixes(&self) -> &[Fix] {
        &self.fixes
    }

    fn global_cutoff(&self) -> f64 {
        self.pairs
            .iter()
            .map(|pair| pair.cutoff)
            .fold(2.5, f64::max)
    }

    pub fn write_to(&self, writer: &mut impl Write, data_file: &str) -> io::Result<()> {
        writeln!(writer, "units lj")?;
        writeln!(writer, "dimension 2")?;
        writeln!(writer, "boundary p p p")?;
        writeln!(writer, "atom_style molecular")?;
        writeln!(writer)?;
        writeln!(writer, "read_data {data_file}")?;
        writeln!(writer)?;

        if !self.bond_coeffs.is_empty() {
            writeln!(writer, "bond_style harmonic")?;
            for (bond_type, [k, r0]) in &self.bond_coeffs {
                writeln!(writer, "bond_coeff {bond_type} {k} {r0}")?;
            }
        }
        if !self.angle_coeffs.is_empty() {
            writeln!(writer, "angle_style harmonic")?;
            for (angle_type, [k, theta0]) in &self.angle_coeffs {
                writeln!(writer, "angle_coeff {angle_type} {k} {theta0}")?;
            }
        }
        if !self.pairs.is_empty() {
            writeln!(writer, "pair_style lj/cut {}", self.global_cutoff())?;
            for pair in &self.pairs {
                let [a, b] = &pair.types;
                writeln!(
                    writer,
                    "pair_coeff {a} {b} {} {} {}",
                    pair.epsilon, pair.sigma, pair.cutoff
                )?;
            }
        }
        writeln!(writer)?;

        for (name, atom_types) in &self.groups {
            let types: Vec<_> = atom_types.iter().map(usize::to_string).collect();
            writeln!(writer, "group {name} type {}", types.join(" "))?;
        }
        writeln!(writer)?;

        for (i_fix, fix) in self.fixes.iter().enumerate() {
            writeln!(writer, "fix {} {} {}", i_fix + 1, fix.group, fix.style)?;
        }
        writeln!(writer)?;

        if let Some(dump) = &self.dump {
            writeln!(writer, "dump {dump}")?;
        }
        writeln!(writer, "timestep {}", self.timestep)?;
        writeln!(writer, "run {}", self.run_steps)?;

        Ok(())
    }
}

/// A named simulation written as `<name>.data` and `<name>.in`.
#[derive(Debug)]
pub struct Simulation {
    name: String,
    out_dir: PathBuf,
    pub data: DataFile,
    pub script: Script,
}

impl Simulation {
    pub fn new<P: AsRef<Path>>(name: &str, out_dir: P, script: Script) -> Self {
        Self {
            name: name.to_string(),
            out_dir: out_dir.as_ref().to_path_buf(),
            data: DataFile::new(),
            script,
        }
    }

    pub fn data_file(&self) -> PathBuf {
        self.out_dir.join(format!("{}.data", self.name))
    }

    pub fn script_file(&self) -> PathBuf {
        self.out_dir.join(format!("{}.in", self.name))
    }

    /// Write the data file and the input script.
    pub fn save(&self) -> Result<()> {
        let data_file = self.data_file();
        let file = File::create(&data_file).with_context(|| format!("failed to create {data_file:?}"))?;
        let mut writer = BufWriter::new(file);
        self.data
            .write_to(&mut writer)
            .and_then(|()| writer.flush())
            .with_context(|| format!("failed to write {data_file:?}"))?;

        let script_file = self.script_file();
        let file =
            File::create(&script_file).with_context(|| format!("failed to create {script_file:?}"))?;
        let mut writer = BufWriter::new(file);
        self.script
            .write_to(&mut writer, &format!("{}.data", self.name))
            .and_then(|()| writer.flush())
            .with_context(|| format!("failed to write {script_file:?}"))?;

        log::info!(
            "saved {data_file:?} ({} atoms, {} bonds, {} angles) and {script_file:?}",
            self.data.atoms().len(),
            self.data.bonds().len(),
            self.data.angles().len()
        );

        Ok(())
    }
}
