//! Sales script stages and pain-point vocabulary
//!
//! The outreach script is a fixed linear progression. Each stage carries
//! the keyword set that, when heard in a user utterance, moves the call to
//! the next stage. Keywords are lower-case Spanish fragments matched by
//! substring containment against the case-folded utterance.

use serde::{Deserialize, Serialize};

/// Stage of the outreach script
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SalesStage {
    /// Opening rapport with the prospect
    #[default]
    Greeting,
    /// Surfacing operational pain points
    PainIdentification,
    /// Pitching the offering against those pains
    SolutionPresentation,
    /// Converging on a follow-up meeting
    MeetingScheduling,
    /// Wrapping up the call
    Closing,
}

impl SalesStage {
    /// Position in the script, starting at 0
    pub fn index(&self) -> usize {
        match self {
            SalesStage::Greeting => 0,
            SalesStage::PainIdentification => 1,
            SalesStage::SolutionPresentation => 2,
            SalesStage::MeetingScheduling => 3,
            SalesStage::Closing => 4,
        }
    }

    /// The stage that follows this one, or `None` for the terminal stage
    pub fn next(&self) -> Option<SalesStage> {
        match self {
            SalesStage::Greeting => Some(SalesStage::PainIdentification),
            SalesStage::PainIdentification => Some(SalesStage::SolutionPresentation),
            SalesStage::SolutionPresentation => Some(SalesStage::MeetingScheduling),
            SalesStage::MeetingScheduling => Some(SalesStage::Closing),
            SalesStage::Closing => None,
        }
    }

    /// Keywords that advance the call out of this stage
    pub fn advance_keywords(&self) -> &'static [&'static str] {
        match self {
            SalesStage::Greeting => &["hola", "buenos", "si", "bien"],
            SalesStage::PainIdentification => &["si", "claro", "exacto", "problema", "dificil"],
            SalesStage::SolutionPresentation => {
                &["interesante", "si", "como", "reunion", "platica"]
            }
            SalesStage::MeetingScheduling => &["si", "cuando", "agenda", "reunion", "perfecto"],
            SalesStage::Closing => &[],
        }
    }

    /// Stage name as used in logs and snapshots
    pub fn tag(&self) -> &'static str {
        match self {
            SalesStage::Greeting => "greeting",
            SalesStage::PainIdentification => "pain_identification",
            SalesStage::SolutionPresentation => "solution_presentation",
            SalesStage::MeetingScheduling => "meeting_scheduling",
            SalesStage::Closing => "closing",
        }
    }
}

/// Operational pain point the prospect can voice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PainPoint {
    /// Slow customer attention
    AtencionLenta,
    /// Overloaded staff
    Sobrecarga,
    /// Falling behind the competition
    Innovacion,
    /// Manual, inefficient processes
    Procesos,
    /// Cost pressure
    Costos,
}

impl PainPoint {
    /// All known pain points, in detection order
    pub const ALL: [PainPoint; 5] = [
        PainPoint::AtencionLenta,
        PainPoint::Sobrecarga,
        PainPoint::Innovacion,
        PainPoint::Procesos,
        PainPoint::Costos,
    ];

    /// Keywords whose presence marks this pain point
    pub fn keywords(&self) -> &'static [&'static str] {
        match self {
            PainPoint::AtencionLenta => &["lento", "tardamos", "demora", "espera", "atencion"],
            PainPoint::Sobrecarga => &["mucho trabajo", "sobrecarga", "saturados", "no damos abasto"],
            PainPoint::Innovacion => &["innovar", "competencia", "quedamos atras", "tecnologia"],
            PainPoint::Procesos => &["manual", "repetitivo", "ineficiente", "procesos"],
            PainPoint::Costos => &["caro", "costos", "gastos", "presupuesto"],
        }
    }

    /// Tag as used in logs and snapshots
    pub fn tag(&self) -> &'static str {
        match self {
            PainPoint::AtencionLenta => "atencion_lenta",
            PainPoint::Sobrecarga => "sobrecarga",
            PainPoint::Innovacion => "innovacion",
            PainPoint::Procesos => "procesos",
            PainPoint::Costos => "costos",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_order_is_linear() {
        let mut stage = SalesStage::default();
        let mut order = vec![stage];
        while let Some(next) = stage.next() {
            assert_eq!(next.index(), stage.index() + 1);
            order.push(next);
            stage = next;
        }
        assert_eq!(order.len(), 5);
        assert_eq!(order.last(), Some(&SalesStage::Closing));
    }

    #[test]
    fn test_closing_is_terminal() {
        assert_eq!(SalesStage::Closing.next(), None);
        assert!(SalesStage::Closing.advance_keywords().is_empty());
    }

    #[test]
    fn test_every_open_stage_has_keywords() {
        for stage in [
            SalesStage::Greeting,
            SalesStage::PainIdentification,
            SalesStage::SolutionPresentation,
            SalesStage::MeetingScheduling,
        ] {
            assert!(!stage.advance_keywords().is_empty(), "{:?}", stage);
        }
    }

    #[test]
    fn test_pain_point_tags_are_unique() {
        let mut tags: Vec<_> = PainPoint::ALL.iter().map(|p| p.tag()).collect();
        tags.sort();
        tags.dedup();
        assert_eq!(tags.len(), PainPoint::ALL.len());
    }
}
