//! Extraction of trailing events from the final upstream response.

use std::collections::HashSet;

use super::events::{Citation, RelayEvent};
use crate::upstream::types::{Annotation, FinalResponse, MessageContent, OutputItem, SummaryPart};

/// Events emitted after the last text delta, in wire order:
/// generated images (each followed by its revised prompt), citations,
/// reasoning summary, response id and finally the incomplete reason.
pub fn finalization_events(response: &FinalResponse) -> Vec<RelayEvent> {
    let mut events = Vec::new();
    let mut seen_images = HashSet::new();

    for item in &response.output {
        if let OutputItem::ImageGenerationCall {
            result,
            revised_prompt,
        } = item
        {
            if let Some(base64) = result.as_deref().filter(|b| !b.is_empty()) {
                if seen_images.insert(base64) {
                    events.push(RelayEvent::ImageFinal {
                        base64: base64.to_string(),
                    });
                }
            }
            if let Some(text) = revised_prompt.as_deref().filter(|t| !t.is_empty()) {
                events.push(RelayEvent::RevisedPrompt {
                    text: text.to_string(),
                });
            }
        }
    }

    events.extend(collect_citations(response).into_iter().map(RelayEvent::Citation));

    if let Some(text) = reasoning_summary(response) {
        events.push(RelayEvent::ReasoningSummary { text });
    }

    if let Some(id) = response.id.as_deref().filter(|id| !id.is_empty()) {
        events.push(RelayEvent::ResponseId { id: id.to_string() });
    }

    if response.status.as_deref() == Some("incomplete") {
        if let Some(reason) = response
            .incomplete_details
            .as_ref()
            .and_then(|d| d.reason.as_deref())
            .filter(|r| !r.is_empty())
        {
            events.push(RelayEvent::Incomplete {
                reason: reason.to_string(),
            });
        }
    }

    events
}

/// URL citations from message annotations and web search sources,
/// de-duplicated by URL in first-seen order.
fn collect_citations(response: &FinalResponse) -> Vec<Citation> {
    let mut seen = HashSet::new();
    let mut citations = Vec::new();
    let mut push = |url: Option<&String>, title: Option<&String>| {
        let Some(url) = url.map(|u| u.trim()).filter(|u| !u.is_empty()) else {
            return;
        };
        if seen.insert(url.to_string()) {
            citations.push(Citation {
                url: url.to_string(),
                title: title.cloned(),
            });
        }
    };

    for item in &response.output {
        match item {
            OutputItem::Message { content } => {
                for part in content {
                    if let MessageContent::OutputText { annotations } = part {
                        for annotation in annotations {
                            if let Annotation::UrlCitation { url, title } = annotation {
                                push(url.as_ref(), title.as_ref());
                            }
                        }
                    }
                }
            }
            OutputItem::WebSearchCall {
                action: Some(action),
            } => {
                for source in &action.sources {
                    push(source.url.as_ref(), source.title.as_ref());
                }
            }
            _ => {}
        }
    }

    citations
}

/// First summary text of the last reasoning item that has one.
fn reasoning_summary(response: &FinalResponse) -> Option<String> {
    response
        .output
        .iter()
        .filter_map(|item| match item {
            OutputItem::Reasoning { summary } => summary.iter().find_map(|part| match part {
                SummaryPart::SummaryText { text } if !text.is_empty() => Some(text.clone()),
                _ => None,
            }),
            _ => None,
        })
        .last()
}
