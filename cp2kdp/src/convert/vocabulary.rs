use std::fmt;

use itertools::Itertools;
use thiserror::Error;

use crate::convert::frames::FrameRecord;


#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AtomType {
    pub id:    usize,
    pub label: String,
}


/// Why a frame disagrees with the vocabulary. `channel` names the source of the labels.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum TypeMismatch {
    #[error("{channel} has {found} atoms, expected {expected}")]
    AtomCount {
        channel:  &'static str,
        expected: usize,
        found:    usize,
    },

    #[error("{channel} has species {found:?} at atom #{index}, expected {expected:?}")]
    Label {
        channel:  &'static str,
        index:    usize,
        expected: String,
        found:    String,
    },
}


/// Species vocabulary fixed by the first frame of the first run.
///
/// Type ids follow the first-seen order of the labels. Besides the deduplicated
/// types it keeps the full per-atom label list, since every later frame must list
/// the same species at the same positions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeVocabulary {
    types:       Vec<AtomType>,
    atom_labels: Vec<String>,
    atom_types:  Vec<usize>,
}


impl TypeVocabulary {
    pub fn from_labels<S: AsRef<str>>(labels: &[S]) -> Self {
        let mut types: Vec<AtomType> = vec![];
        let mut atom_types = Vec::with_capacity(labels.len());

        for label in labels.iter() {
            let label: &str = label.as_ref();
            let id = match types.iter().position(|t| t.label == label) {
                Some(id) => id,
                None => {
                    types.push(AtomType { id: types.len(), label: label.to_owned() });
                    types.len() - 1
                }
            };
            atom_types.push(id);
        }

        Self {
            types,
            atom_labels: labels.iter().map(|s| s.as_ref().to_owned()).collect(),
            atom_types,
        }
    }

    pub fn from_frame(frame: &FrameRecord) -> Self {
        Self::from_labels(&frame.labels)
    }

    pub fn natoms(&self) -> usize { self.atom_labels.len() }
    pub fn ntypes(&self) -> usize { self.types.len() }
    pub fn types(&self) -> &[AtomType] { &self.types }
    pub fn atom_labels(&self) -> &[String] { &self.atom_labels }

    /// Type id of every atom, in atom order.
    pub fn atom_types(&self) -> &[usize] { &self.atom_types }

    /// Positional check of a label list against the vocabulary.
    pub fn validate_labels<S: AsRef<str>>(&self, channel: &'static str, labels: &[S]) -> Result<(), TypeMismatch> {
        if labels.len() != self.natoms() {
            return Err(TypeMismatch::AtomCount {
                channel,
                expected: self.natoms(),
                found: labels.len(),
            });
        }

        match self.atom_labels.iter().zip(labels.iter()).position(|(a, b)| a != b.as_ref()) {
            None => Ok(()),
            Some(index) => Err(TypeMismatch::Label {
                channel,
                index,
                expected: self.atom_labels[index].clone(),
                found: labels[index].as_ref().to_owned(),
            }),
        }
    }

    /// Checks the labels of both channels and the vector counts of a frame.
    pub fn validate(&self, frame: &FrameRecord) -> Result<(), TypeMismatch> {
        self.validate_labels("positions", &frame.labels)?;
        self.validate_labels("forces", &frame.force_labels)?;

        for (channel, n) in [("positions", frame.positions.len()), ("forces", frame.forces.len())] {
            if n != self.natoms() {
                return Err(TypeMismatch::AtomCount { channel, expected: self.natoms(), found: n });
            }
        }
        Ok(())
    }
}


impl fmt::Display for TypeVocabulary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts = self.types.iter()
            .map(|t| format!("{}({}) x {}", t.label, t.id, self.atom_types.iter().filter(|&&i| i == t.id).count()))
            .join(", ");
        write!(f, "{} atoms of {} types: {}", self.natoms(), self.ntypes(), counts)
    }
}
