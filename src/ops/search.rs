use std::ops::Range;

use regex::Regex;

use crate::model::board::View;
use crate::model::case::Case;

/// Which field of a case matched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchField {
    InternalId,
    Client,
    Tag,
    BenefitType,
    Protocol,
    Benefit,
    Npu,
    Task,
    History,
}

impl MatchField {
    /// Human label, shown next to each hit in terminal output.
    pub fn label(self) -> &'static str {
        match self {
            MatchField::InternalId => "número",
            MatchField::Client => "cliente",
            MatchField::Tag => "etiqueta",
            MatchField::BenefitType => "benefício",
            MatchField::Protocol => "protocolo",
            MatchField::Benefit => "NB",
            MatchField::Npu => "NPU",
            MatchField::Task => "tarefa",
            MatchField::History => "histórico",
        }
    }

    /// Stable identifier used in `--json` output.
    pub fn key(self) -> &'static str {
        match self {
            MatchField::InternalId => "internal_id",
            MatchField::Client => "client",
            MatchField::Tag => "tag",
            MatchField::BenefitType => "benefit_type",
            MatchField::Protocol => "protocol",
            MatchField::Benefit => "benefit_number",
            MatchField::Npu => "npu",
            MatchField::Task => "task",
            MatchField::History => "history",
        }
    }
}

/// A search hit, carrying the matched field text so callers can
/// highlight the spans without re-walking the case.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub case_id: String,
    pub internal_id: String,
    pub field: MatchField,
    pub text: String,
    pub spans: Vec<Range<usize>>,
}

/// Collect all non-overlapping match byte-ranges for a regex in the given text.
fn find_matches(re: &Regex, text: &str) -> Vec<Range<usize>> {
    re.find_iter(text).map(|m| m.start()..m.end()).collect()
}

// ---------------------------------------------------------------------------
// Case search
// ---------------------------------------------------------------------------

/// Search cases by regex. If `view_filter` is `Some`, only cases on that
/// board are searched; otherwise every case in the office is.
pub fn search_cases(cases: &[Case], re: &Regex, view_filter: Option<View>) -> Vec<SearchHit> {
    let mut hits = Vec::new();
    for case in cases {
        if let Some(view) = view_filter
            && case.view != view
        {
            continue;
        }
        search_case(re, case, &mut hits);
    }
    hits
}

fn search_case(re: &Regex, case: &Case, hits: &mut Vec<SearchHit>) {
    let mut push = |field: MatchField, text: &str| {
        let spans = find_matches(re, text);
        if !spans.is_empty() {
            hits.push(SearchHit {
                case_id: case.id.clone(),
                internal_id: case.internal_id.clone(),
                field,
                text: text.to_string(),
                spans,
            });
        }
    };

    push(MatchField::InternalId, &case.internal_id);
    push(MatchField::Client, &case.client_name);
    for tag in &case.tags {
        push(MatchField::Tag, tag);
    }
    if let Some(benefit_type) = &case.benefit_type {
        push(MatchField::BenefitType, benefit_type);
    }
    if let Some(protocol) = &case.protocol_number {
        push(MatchField::Protocol, protocol);
    }
    if let Some(nb) = &case.benefit_number {
        push(MatchField::Benefit, nb);
    }
    for ms in &case.mandados_seguranca {
        push(MatchField::Npu, &ms.npu);
    }
    for task in &case.tasks {
        push(MatchField::Task, &task.title);
    }
    for entry in &case.history {
        push(MatchField::History, &entry.details);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::board::ADMIN_TRIAGE_COLUMN;
    use crate::model::case::{MandadoSeguranca, MsReason, MsStatus};
    use chrono::{NaiveDate, TimeZone, Utc};

    fn sample_cases() -> Vec<Case> {
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap();
        let mut a = Case::new(
            "c1".to_string(),
            "2024.001".to_string(),
            "Maria Silva".to_string(),
            View::Admin,
            ADMIN_TRIAGE_COLUMN.to_string(),
            "Ana",
            now,
        );
        a.benefit_type = Some("Aposentadoria por invalidez".to_string());
        a.protocol_number = Some("555123".to_string());
        a.tags.push("URGENTE".to_string());
        a.add_task("Conferir laudo médico".to_string());

        let mut b = Case::new(
            "c2".to_string(),
            "2024.002".to_string(),
            "João Pereira".to_string(),
            View::Judicial,
            "jud_triagem".to_string(),
            "Ana",
            now,
        );
        b.mandados_seguranca.push(MandadoSeguranca {
            npu: "5001234-11.2024.4.04.7100".to_string(),
            filing_date: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
            status: MsStatus::Aguardando,
            reason: MsReason::DemoraAnalise,
        });

        vec![a, b]
    }

    #[test]
    fn matches_client_names() {
        let cases = sample_cases();
        let re = Regex::new("Silva").unwrap();
        let hits = search_cases(&cases, &re, None);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].internal_id, "2024.001");
        assert_eq!(hits[0].field, MatchField::Client);
        assert_eq!(hits[0].spans, vec![6..11]);
    }

    #[test]
    fn matches_tags_and_tasks() {
        let cases = sample_cases();
        let re = Regex::new("URGENTE").unwrap();
        let hits = search_cases(&cases, &re, None);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].field, MatchField::Tag);

        let re = Regex::new("laudo").unwrap();
        let hits = search_cases(&cases, &re, None);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].field, MatchField::Task);
        assert_eq!(hits[0].text, "Conferir laudo médico");
    }

    #[test]
    fn matches_protocol_and_npu() {
        let cases = sample_cases();
        let re = Regex::new("555123").unwrap();
        let hits = search_cases(&cases, &re, None);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].field, MatchField::Protocol);

        let re = Regex::new("5001234").unwrap();
        let hits = search_cases(&cases, &re, None);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].field, MatchField::Npu);
        assert_eq!(hits[0].case_id, "c2");
    }

    #[test]
    fn matches_history_details() {
        let cases = sample_cases();
        let re = Regex::new("Caso criado").unwrap();
        let hits = search_cases(&cases, &re, None);
        // the creation entry exists on both cases
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|h| h.field == MatchField::History));
    }

    #[test]
    fn view_filter_restricts_the_search() {
        let cases = sample_cases();
        let re = Regex::new("(?i)20").unwrap();

        let all = search_cases(&cases, &re, None);
        assert!(all.iter().any(|h| h.case_id == "c1"));
        assert!(all.iter().any(|h| h.case_id == "c2"));

        let judicial = search_cases(&cases, &re, Some(View::Judicial));
        assert!(judicial.iter().all(|h| h.case_id == "c2"));
    }

    #[test]
    fn regex_alternation_and_case_insensitivity() {
        let cases = sample_cases();
        let re = Regex::new("(?i)silva|pereira").unwrap();
        let hits = search_cases(&cases, &re, None);
        let clients: Vec<_> = hits
            .iter()
            .filter(|h| h.field == MatchField::Client)
            .collect();
        assert_eq!(clients.len(), 2);
    }

    #[test]
    fn no_matches_is_empty() {
        let cases = sample_cases();
        let re = Regex::new("zzzznotfound").unwrap();
        assert!(search_cases(&cases, &re, None).is_empty());
    }

    #[test]
    fn multiple_spans_in_one_field() {
        let cases = sample_cases();
        let re = Regex::new("a").unwrap();
        let hits = search_cases(&cases, &re, Some(View::Admin));
        let client: Vec<_> = hits
            .iter()
            .filter(|h| h.field == MatchField::Client)
            .collect();
        assert_eq!(client.len(), 1);
        assert!(client[0].spans.len() > 1);
    }
}
