use crate::kinds::ContentKind;

const EVENTS_QUERY: &str = r#"
query AllEvent {
  allEvent(first: 10000) {
    nodes {
      content
      location {
        active
        name
      }
      slug
      title
      uri
      acfGroupEvent {
        bookingLink
        occasions {
          startDate
          endDate
        }
        rcrRules {
          rcrStartDate
          rcrEndDate
          rcrStartTime
          rcrEndTime
          rcrWeekDay
          rcrWeeklyInterval
          rcrExceptions {
            rcrExcDate
          }
        }
      }
      date
    }
  }
}
"#;

/// GraphQL document for `kind`. Pages are limited to published content in `language`.
pub fn query_for(kind: ContentKind, language: &str) -> String {
    match kind {
        ContentKind::Events => EVENTS_QUERY.to_string(),
        ContentKind::Pages => format!(
            r#"
query Pages {{
  pages(first: 2000, where: {{ status: PUBLISH, language: {} }}) {{
    nodes {{
      content
      date
      title
      uri
    }}
  }}
}}
"#,
            language
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_query_selects_recurrence_rules() {
        let q = query_for(ContentKind::Events, "SV");
        assert!(q.contains("allEvent(first: 10000)"));
        assert!(q.contains("rcrExceptions"));
        assert!(q.contains("bookingLink"));
    }

    #[test]
    fn test_pages_query_filters_language() {
        let q = query_for(ContentKind::Pages, "EN");
        assert!(q.contains("pages(first: 2000, where: { status: PUBLISH, language: EN })"));
    }
}
