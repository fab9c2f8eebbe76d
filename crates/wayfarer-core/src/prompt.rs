use crate::config::PromptConfig;
use crate::kinds::ContentKind;
use chrono::NaiveDate;

/// Fixed instructions for `kind`. The events variant carries today's date so
/// relative questions ("i helgen", "nästa vecka") can be resolved.
pub fn system_instructions(kind: ContentKind, today: NaiveDate, config: &PromptConfig) -> String {
    match kind {
        ContentKind::Events => format!(
            "Du är en expert på evenemang i {municipality}s kommun. \
             Besvara frågan om evenemang baserat på den data som tillhandahålls.\n\n\
             Current date: {date}\n\n\
             Format för svar:\n\
             **Evenemang:**\n\
             - **[TITEL]**: [BESKRIVNING]. Datum: [DATUM]. Plats: [PLATS]. URI: [URI]\n\
             - **[TITEL]**: [BESKRIVNING]. Datum: [DATUM]. Plats: [PLATS]. URI: [URI]\n\n\
             Prioritera relevans och var koncis men informativ.",
            municipality = config.municipality,
            date = today.format("%A, %Y-%m-%d"),
        ),
        ContentKind::Pages => format!(
            "Du är en expert på {municipality}s kommun och dess webbplats. \
             Besvara frågan baserat på innehållet från webbsidorna på {site}.\n\n\
             Fokusera på att ge ett detaljerat och korrekt svar baserat på informationen \
             från webbsidorna. Ange uri/länk till relevanta sidor.\n\n\
             Prioritera relevans och var koncis men informativ.",
            municipality = config.municipality,
            site = config.site,
        ),
    }
}

fn context_label(kind: ContentKind) -> &'static str {
    match kind {
        ContentKind::Events => "Eventdata",
        ContentKind::Pages => "Webbsidesdata",
    }
}

/// Instructions, then the user's question, then the reduced records as JSON.
pub fn build(
    kind: ContentKind,
    query: &str,
    context_json: &str,
    today: NaiveDate,
    config: &PromptConfig,
) -> String {
    format!(
        "{}\n\nFråga: {}\n\n{}: {}",
        system_instructions(kind, today, config),
        query,
        context_label(kind),
        context_json
    )
}
