//! # Potential declarations
//!
//! Potentials are declared in an ini-like text format:
//!
//! ```text
//! # Milky Way model
//! [Potential disc]
//! type = MiyamotoNagai
//! mass = 6.8e10
//! scaleRadius = 3.0
//! scaleHeight = 0.28
//!
//! [Potential bar]
//! type=DehnenBar
//! strength=1500
//! barRadius=3.5
//! scale=bar_growth.txt
//! ```
//!
//! * A header `[Potential <name>]` opens a component (the name is optional); all components of
//!   a file are summed.
//! * `key=value` and `key = value` lines set parameters; keys are case-insensitive.
//! * `#` and `;` start comment lines.
//! * `scale=<file>` wraps the component in a
//!   [`ScaledPotential`](crate::potential::ScaledPotential) driven by the growth table stored
//!   in `<file>`.
//! * A component of `type=Evolving` lists its snapshots after a `Timestamps` line (or a
//!   `[Timestamps]` header) as `<time> <filename>` pairs in increasing time; each file is
//!   itself a declaration. `interpLinear=false` switches to piecewise-constant snapshots.
//!
//! Relative file names are resolved against the directory of the declaring file.
//!
//! | `type`          | parameters                                     |
//! |-----------------|------------------------------------------------|
//! | `Plummer`       | `mass`, `scaleRadius`                          |
//! | `MiyamotoNagai` | `mass`, `scaleRadius`, `scaleHeight`           |
//! | `Logarithmic`   | `v0`, `scaleRadius` (0), `axisRatioZ` (1)      |
//! | `NFW`           | `mass`, `scaleRadius`                          |
//! | `DehnenBar`     | `strength`, `barRadius`, `barAngle` (0, deg)   |
//! | `Evolving`      | `interpLinear` (true), timestamps              |
//!
//! Masses are converted with the gravitational constant of the [`UnitSystem`] passed to
//! [`PotentialDeclaration::build`].
//!
//! Time-dependent models built in memory go through [`EvolvingPotentialSpec`], an ordered list
//! of `(time, declaration)` pairs; writing it out as files is a separate step
//! ([`EvolvingPotentialSpec::write_files`]).
use std::{fs, str::FromStr};

use camino::{Utf8Path, Utf8PathBuf};
use nom::{
    bytes::complete::{tag_no_case, take_until, take_while1},
    character::complete::{char, space1},
    combinator::{all_consuming, rest},
    number::complete::double,
    sequence::{delimited, preceded, separated_pair},
    IResult, Parser,
};

use crate::{
    bibimb_errors::BibimbError,
    constants::{Time, UnitSystem},
    growth_curve::GrowthTable,
    numeric::is_strictly_increasing,
};

use super::{
    CompositePotential, DehnenBar, EvolvingPotential, Logarithmic, MiyamotoNagai, Nfw, Plummer,
    Potential, ScaledPotential,
};

/// One `[Potential <name>]` block.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PotentialSection {
    pub name: String,
    /// Parameters in declaration order.
    pub params: Vec<(String, String)>,
    /// `(time, file)` snapshots of an `Evolving` component.
    pub timestamps: Vec<(Time, String)>,
}

impl PotentialSection {
    pub fn new(name: &str, kind: &str) -> Self {
        PotentialSection {
            name: name.to_string(),
            params: vec![("type".to_string(), kind.to_string())],
            timestamps: Vec::new(),
        }
    }

    pub fn with_param(mut self, key: &str, value: impl ToString) -> Self {
        self.params.push((key.to_string(), value.to_string()));
        self
    }

    pub fn with_timestamp(mut self, time: Time, file: &str) -> Self {
        self.timestamps.push((time, file.to_string()));
        self
    }

    /// Last value given for `key` (case-insensitive).
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .rev()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    pub fn kind(&self) -> Result<&str, BibimbError> {
        self.get("type").ok_or_else(|| {
            BibimbError::FileFormat(format!("potential section '{}' has no type", self.name))
        })
    }

    fn get_f64(&self, key: &str) -> Result<Option<f64>, BibimbError> {
        self.get(key)
            .map(|v| {
                v.trim().parse::<f64>().map_err(|_| {
                    BibimbError::FileFormat(format!(
                        "parameter {key} of potential '{}' is not a number: {v}",
                        self.name
                    ))
                })
            })
            .transpose()
    }

    fn require_f64(&self, key: &str) -> Result<f64, BibimbError> {
        self.get_f64(key)?.ok_or_else(|| {
            BibimbError::FileFormat(format!(
                "potential '{}' is missing parameter {key}",
                self.name
            ))
        })
    }

    fn get_bool(&self, key: &str, default: bool) -> Result<bool, BibimbError> {
        match self.get(key).map(|v| v.trim().to_ascii_lowercase()) {
            None => Ok(default),
            Some(v) => match v.as_str() {
                "true" | "yes" | "1" => Ok(true),
                "false" | "no" | "0" => Ok(false),
                _ => Err(BibimbError::FileFormat(format!(
                    "parameter {key} of potential '{}' is not a boolean: {v}",
                    self.name
                ))),
            },
        }
    }

    /// Build this component.
    ///
    /// Arguments
    /// -----------------
    /// * `units`: unit system of the masses and of the integration.
    /// * `base_dir`: directory against which `scale` and timestamp files are resolved.
    pub fn build(
        &self,
        units: &UnitSystem,
        base_dir: &Utf8Path,
    ) -> Result<Box<dyn Potential>, BibimbError> {
        let g = units.gravitational_constant();
        let kind = self.kind()?;

        let potential: Box<dyn Potential> = match kind.to_ascii_lowercase().as_str() {
            "plummer" => Box::new(Plummer::new(
                g * self.require_f64("mass")?,
                self.require_f64("scaleRadius")?,
            )),
            "miyamotonagai" => Box::new(MiyamotoNagai::new(
                g * self.require_f64("mass")?,
                self.require_f64("scaleRadius")?,
                self.require_f64("scaleHeight")?,
            )),
            "logarithmic" => Box::new(Logarithmic::new(
                self.require_f64("v0")?,
                self.get_f64("scaleRadius")?.unwrap_or(0.0),
                self.get_f64("axisRatioZ")?.unwrap_or(1.0),
            )),
            "nfw" => Box::new(Nfw::new(
                g * self.require_f64("mass")?,
                self.require_f64("scaleRadius")?,
            )),
            "dehnenbar" => Box::new(DehnenBar::new(
                self.require_f64("strength")?,
                self.require_f64("barRadius")?,
                self.get_f64("barAngle")?.unwrap_or(0.0),
            )),
            "evolving" => {
                let snapshots = self
                    .timestamps
                    .iter()
                    .map(|(t, file)| {
                        let path = resolve(base_dir, file);
                        read_potential(&path, units).map(|p| (*t, p))
                    })
                    .collect::<Result<Vec<_>, BibimbError>>()?;
                Box::new(EvolvingPotential::new(
                    snapshots,
                    self.get_bool("interpLinear", true)?,
                )?)
            }
            other => return Err(BibimbError::UnknownPotential(other.to_string())),
        };

        match self.get("scale") {
            Some(file) => {
                let table = GrowthTable::read_file(&resolve(base_dir, file.trim()))?;
                Ok(Box::new(ScaledPotential::new(potential, table)))
            }
            None => Ok(potential),
        }
    }
}

/// A parsed declaration file: every section is one summed component.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PotentialDeclaration {
    pub sections: Vec<PotentialSection>,
}

impl PotentialDeclaration {
    pub fn new(sections: Vec<PotentialSection>) -> Self {
        PotentialDeclaration { sections }
    }

    /// Build the declared potential; several sections are summed.
    pub fn build(
        &self,
        units: &UnitSystem,
        base_dir: &Utf8Path,
    ) -> Result<Box<dyn Potential>, BibimbError> {
        let mut components = self
            .sections
            .iter()
            .map(|s| s.build(units, base_dir))
            .collect::<Result<Vec<_>, BibimbError>>()?;

        match components.len() {
            0 => Err(BibimbError::FileFormat(
                "potential declaration has no [Potential] section".into(),
            )),
            1 => Ok(components.remove(0)),
            _ => Ok(Box::new(CompositePotential::new(components))),
        }
    }

    /// Render the declaration in the ini format.
    pub fn to_ini(&self) -> String {
        let mut out = String::new();
        for (i, section) in self.sections.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            if section.name.is_empty() {
                out.push_str("[Potential]\n");
            } else {
                out.push_str(&format!("[Potential {}]\n", section.name));
            }
            for (k, v) in &section.params {
                out.push_str(&format!("{k}={v}\n"));
            }
            if !section.timestamps.is_empty() {
                out.push_str("Timestamps\n");
                for (t, file) in &section.timestamps {
                    out.push_str(&format!("{t} {file}\n"));
                }
            }
        }
        out
    }

    pub fn write_file(&self, path: &Utf8Path) -> Result<(), BibimbError> {
        fs::write(path, self.to_ini())?;
        Ok(())
    }

    pub fn read_file(path: &Utf8Path) -> Result<Self, BibimbError> {
        fs::read_to_string(path)?.parse()
    }
}

/// Read a declaration file and build its potential.
///
/// Relative file names inside the declaration are resolved against the file's directory.
pub fn read_potential(
    path: &Utf8Path,
    units: &UnitSystem,
) -> Result<Box<dyn Potential>, BibimbError> {
    let declaration = PotentialDeclaration::read_file(path)?;
    let base_dir = path.parent().unwrap_or(Utf8Path::new("."));
    tracing::debug!(%path, sections = declaration.sections.len(), "potential declaration read");
    declaration.build(units, base_dir)
}

fn resolve(base_dir: &Utf8Path, file: &str) -> Utf8PathBuf {
    let path = Utf8Path::new(file);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

// -------------------------------------------------------------------------------------------------
// Parsing
// -------------------------------------------------------------------------------------------------

#[derive(Debug, PartialEq)]
enum IniLine<'a> {
    Potential(&'a str),
    Timestamps,
    KeyValue(&'a str, &'a str),
    Snapshot(f64, &'a str),
}

fn parse_header(input: &str) -> IResult<&str, &str> {
    all_consuming(delimited(char('['), take_until("]"), char(']'))).parse(input)
}

fn parse_potential_name(input: &str) -> IResult<&str, &str> {
    all_consuming(preceded(tag_no_case("potential"), rest))
        .map(|name: &str| name.trim())
        .parse(input)
}

fn parse_key_value(input: &str) -> IResult<&str, (&str, &str)> {
    separated_pair(take_while1(|c: char| c != '='), char('='), rest)
        .map(|(k, v): (&str, &str)| (k.trim(), v.trim()))
        .parse(input)
}

fn parse_snapshot(input: &str) -> IResult<&str, (f64, &str)> {
    (double, preceded(space1, rest))
        .map(|(t, file): (f64, &str)| (t, file.trim()))
        .parse(input)
}

fn classify_line(line: &str, in_timestamps: bool) -> Result<IniLine<'_>, BibimbError> {
    let bad_line = || BibimbError::FileFormat(format!("bad potential declaration line: {line}"));

    if let Ok((_, header)) = parse_header(line) {
        let header = header.trim();
        if header.eq_ignore_ascii_case("timestamps") {
            return Ok(IniLine::Timestamps);
        }
        return parse_potential_name(header)
            .map(|(_, name)| IniLine::Potential(name))
            .map_err(|_| bad_line());
    }

    if line.eq_ignore_ascii_case("timestamps") {
        return Ok(IniLine::Timestamps);
    }

    if in_timestamps {
        return match parse_snapshot(line) {
            Ok((_, (t, file))) if !file.is_empty() => Ok(IniLine::Snapshot(t, file)),
            _ => Err(bad_line()),
        };
    }

    match parse_key_value(line) {
        Ok((_, (k, v))) if !k.is_empty() => Ok(IniLine::KeyValue(k, v)),
        _ => Err(bad_line()),
    }
}

impl FromStr for PotentialDeclaration {
    type Err = BibimbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut sections: Vec<PotentialSection> = Vec::new();
        let mut in_timestamps = false;

        for raw in s.lines() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            match classify_line(line, in_timestamps)? {
                IniLine::Potential(name) => {
                    in_timestamps = false;
                    sections.push(PotentialSection {
                        name: name.to_string(),
                        ..Default::default()
                    });
                }
                IniLine::Timestamps => in_timestamps = true,
                IniLine::KeyValue(k, v) => sections
                    .last_mut()
                    .ok_or_else(|| {
                        BibimbError::FileFormat(format!("parameter outside a section: {line}"))
                    })?
                    .params
                    .push((k.to_string(), v.to_string())),
                IniLine::Snapshot(t, file) => sections
                    .last_mut()
                    .ok_or_else(|| {
                        BibimbError::FileFormat(format!("timestamp outside a section: {line}"))
                    })?
                    .timestamps
                    .push((t, file.to_string())),
            }
        }

        for section in &sections {
            let times: Vec<f64> = section.timestamps.iter().map(|(t, _)| *t).collect();
            if !is_strictly_increasing(&times) {
                return Err(BibimbError::FileFormat(format!(
                    "timestamps of potential '{}' are not increasing",
                    section.name
                )));
            }
        }

        Ok(PotentialDeclaration { sections })
    }
}

// -------------------------------------------------------------------------------------------------
// In-memory evolving potentials
// -------------------------------------------------------------------------------------------------

/// Ordered `(time, declaration)` list describing a potential that evolves in time.
#[derive(Debug, Clone, PartialEq)]
pub struct EvolvingPotentialSpec {
    entries: Vec<(Time, PotentialDeclaration)>,
    interp_linear: bool,
}

impl EvolvingPotentialSpec {
    /// Return
    /// ----------
    /// * [`BibimbError::Configuration`] when `entries` is empty or its times are not strictly
    ///   increasing.
    pub fn new(
        entries: Vec<(Time, PotentialDeclaration)>,
        interp_linear: bool,
    ) -> Result<Self, BibimbError> {
        let times: Vec<f64> = entries.iter().map(|(t, _)| *t).collect();
        if entries.is_empty() || !is_strictly_increasing(&times) {
            return Err(BibimbError::Configuration(
                "evolving potential needs snapshots at strictly increasing times".into(),
            ));
        }
        Ok(EvolvingPotentialSpec {
            entries,
            interp_linear,
        })
    }

    pub fn entries(&self) -> &[(Time, PotentialDeclaration)] {
        &self.entries
    }

    /// Build the evolving potential directly, without touching the file system
    /// (apart from `scale` files referenced by the snapshots, resolved against `base_dir`).
    pub fn build(
        &self,
        units: &UnitSystem,
        base_dir: &Utf8Path,
    ) -> Result<EvolvingPotential, BibimbError> {
        let snapshots = self
            .entries
            .iter()
            .map(|(t, decl)| decl.build(units, base_dir).map(|p| (*t, p)))
            .collect::<Result<Vec<_>, BibimbError>>()?;
        EvolvingPotential::new(snapshots, self.interp_linear)
    }

    /// Write one declaration per snapshot (`<stem>_<index>.ini`) and a master declaration
    /// `<stem>.ini` listing them under `Timestamps`.
    ///
    /// Return
    /// ----------
    /// * The path of the master file.
    pub fn write_files(&self, dir: &Utf8Path, stem: &str) -> Result<Utf8PathBuf, BibimbError> {
        fs::create_dir_all(dir)?;

        let mut master = PotentialSection::new(stem, "Evolving")
            .with_param("interpLinear", self.interp_linear);
        for (i, (t, decl)) in self.entries.iter().enumerate() {
            let file = format!("{stem}_{i:04}.ini");
            decl.write_file(&dir.join(&file))?;
            master = master.with_timestamp(*t, &file);
        }

        let master_path = dir.join(format!("{stem}.ini"));
        PotentialDeclaration::new(vec![master]).write_file(&master_path)?;
        tracing::debug!(path = %master_path, snapshots = self.entries.len(), "evolving potential written");
        Ok(master_path)
    }
}

#[cfg(test)]
mod ini_test {
    use super::*;
    use crate::growth_curve::GrowthMode;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    const MILKY_WAY: &str = "\
# disc + halo
[Potential disc]
type = MiyamotoNagai
mass = 6.8e10
scaleRadius = 3.0
scaleHeight = 0.28

; halo
[Potential halo]
type=NFW
mass=5.4e11
scaleradius=15.6
";

    #[test]
    fn test_parse_sections() {
        let decl: PotentialDeclaration = MILKY_WAY.parse().unwrap();
        assert_eq!(decl.sections.len(), 2);
        assert_eq!(decl.sections[0].name, "disc");
        assert_eq!(decl.sections[0].kind().unwrap(), "MiyamotoNagai");
        assert_eq!(decl.sections[0].get("scaleheight"), Some("0.28"));
        assert_eq!(decl.sections[1].get("scaleRadius"), Some("15.6"));
    }

    #[test]
    fn test_build_composite() {
        let units = UnitSystem::default();
        let decl: PotentialDeclaration = MILKY_WAY.parse().unwrap();
        let pot = decl.build(&units, Utf8Path::new(".")).unwrap();

        let g = units.gravitational_constant();
        let expected = CompositePotential::default()
            .with(MiyamotoNagai::new(g * 6.8e10, 3.0, 0.28))
            .with(Nfw::new(g * 5.4e11, 15.6));
        let pos = Vector3::new(8.0, 0.5, 0.1);
        assert_relative_eq!(pot.value(&pos, 0.0), expected.value(&pos, 0.0));
        // a realistic rotation curve around the Sun
        let vc = pot.circular_velocity(8.0, 0.0);
        assert!(vc > 150.0 && vc < 300.0, "vc = {vc}");
    }

    #[test]
    fn test_round_trip() {
        let decl: PotentialDeclaration = MILKY_WAY.parse().unwrap();
        let again: PotentialDeclaration = decl.to_ini().parse().unwrap();
        assert_eq!(again, decl);
    }

    #[test]
    fn test_errors() {
        let units = UnitSystem::default();
        let here = Utf8Path::new(".");

        let unknown: PotentialDeclaration = "[Potential]\ntype=Ferrers\n".parse().unwrap();
        assert!(matches!(
            unknown.build(&units, here),
            Err(BibimbError::UnknownPotential(_))
        ));

        let missing: PotentialDeclaration = "[Potential]\ntype=Plummer\nmass=1\n".parse().unwrap();
        assert!(matches!(
            missing.build(&units, here),
            Err(BibimbError::FileFormat(_))
        ));

        assert!(matches!(
            "mass=1\n".parse::<PotentialDeclaration>(),
            Err(BibimbError::FileFormat(_))
        ));
        assert!(matches!(
            "[Potential]\njust words\n".parse::<PotentialDeclaration>(),
            Err(BibimbError::FileFormat(_))
        ));
        assert!(matches!(
            "[Potential]\ntype=Evolving\nTimestamps\n1 a.ini\n0 b.ini\n"
                .parse::<PotentialDeclaration>(),
            Err(BibimbError::FileFormat(_))
        ));
        assert!(matches!(
            PotentialDeclaration::default().build(&units, here),
            Err(BibimbError::FileFormat(_))
        ));
    }

    #[test]
    fn test_timestamps_section() {
        let text = "[Potential bar]\ntype=Evolving\ninterpLinear=False\n[Timestamps]\n0 a.ini\n1.5 b.ini\n";
        let decl: PotentialDeclaration = text.parse().unwrap();
        assert_eq!(
            decl.sections[0].timestamps,
            vec![(0.0, "a.ini".to_string()), (1.5, "b.ini".to_string())]
        );
        assert!(!decl.sections[0].get_bool("interpLinear", true).unwrap());
    }

    #[test]
    fn test_scaled_component_from_file() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = Utf8PathBuf::from_path_buf(tmp.path().to_path_buf()).unwrap();

        GrowthTable::generate(2.0, GrowthMode::Linear, 3, 1.0)
            .unwrap()
            .write_file(&dir.join("growth.txt"))
            .unwrap();
        let decl = PotentialDeclaration::new(vec![PotentialSection::new("bar", "DehnenBar")
            .with_param("strength", 1000.0)
            .with_param("barRadius", 3.0)
            .with_param("scale", "growth.txt")]);
        decl.write_file(&dir.join("bar.ini")).unwrap();

        let pot = read_potential(&dir.join("bar.ini"), &UnitSystem::default()).unwrap();
        assert!(pot.is_time_dependent());
        let pos = Vector3::new(4.0, 1.0, 0.0);
        let full = DehnenBar::new(1000.0, 3.0, 0.0).value(&pos, 0.0);
        assert_eq!(pot.value(&pos, 0.0), 0.0);
        assert_relative_eq!(pot.value(&pos, 1.0), 0.5 * full, max_relative = 1e-14);
        assert_relative_eq!(pot.value(&pos, 3.0), full, max_relative = 1e-14);
    }

    #[test]
    fn test_evolving_spec_files() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = Utf8PathBuf::from_path_buf(tmp.path().to_path_buf()).unwrap();
        let units = UnitSystem::default();

        let snapshot = |mass: f64| {
            PotentialDeclaration::new(vec![PotentialSection::new("", "Plummer")
                .with_param("mass", mass)
                .with_param("scaleRadius", 1.0)])
        };
        let spec = EvolvingPotentialSpec::new(
            vec![(0.0, snapshot(1e10)), (1.0, snapshot(3e10))],
            true,
        )
        .unwrap();

        let in_memory = spec.build(&units, &dir).unwrap();
        let master = spec.write_files(&dir.join("evolving"), "bar").unwrap();
        let from_files = read_potential(&master, &units).unwrap();

        let pos = Vector3::new(2.0, -1.0, 0.3);
        for t in [-0.5, 0.0, 0.25, 0.8, 1.0, 2.0] {
            assert_relative_eq!(
                in_memory.value(&pos, t),
                from_files.value(&pos, t),
                max_relative = 1e-14
            );
        }
        assert!(EvolvingPotentialSpec::new(vec![], true).is_err());
    }

    #[test]
    fn test_to_ini_text() {
        let decl = PotentialDeclaration::new(vec![
            PotentialSection::new("halo", "NFW")
                .with_param("mass", 1e12)
                .with_param("scaleRadius", 20.0),
            PotentialSection::new("", "Evolving")
                .with_timestamp(0.0, "a.ini")
                .with_timestamp(1.5, "b.ini"),
        ]);
        assert_eq!(
            decl.to_ini(),
            "[Potential halo]\ntype=NFW\nmass=1000000000000\nscaleRadius=20\n\n\
             [Potential]\ntype=Evolving\nTimestamps\n0 a.ini\n1.5 b.ini\n"
        );
    }
}
