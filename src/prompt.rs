use crate::errors::{ReviewError, ReviewResult};
use crate::file_scanner::Listing;
use crate::tags::Tag;

const NONE_PLACEHOLDER: &str = "(none)";

fn bullet_list(names: &[String]) -> String {
    if names.is_empty() {
        return format!("- {NONE_PLACEHOLDER}");
    }
    names
        .iter()
        .map(|n| format!("- {n}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Review prompt for `target`, citing the standard and template documents.
pub fn build_prompt(target: &str, standards: &[String], templates: &[String]) -> String {
    format!(
        "Using the [{std}] and [{tpl}] documents as the reference, review the [{rev}] document item by item: {target}\n\
         \n\
         [{std}]\n\
         {standards}\n\
         \n\
         [{tpl}]\n\
         {templates}\n\
         \n\
         Please output:\n\
         1) Non-conformities\n\
         2) Risks\n\
         3) Concrete revision suggestions\n\
         4) Items requiring manual confirmation\n",
        std = Tag::Standard.label(),
        tpl = Tag::Template.label(),
        rev = Tag::PendingReview.label(),
        standards = bullet_list(standards),
        templates = bullet_list(templates),
    )
}

/// Picks the review target: an explicit pending-review file, or the first one.
pub fn resolve_target(listing: &Listing, wanted: Option<&str>) -> ReviewResult<String> {
    let targets = listing.review_targets();
    match wanted {
        Some(name) => {
            let Some(entry) = listing.find(name) else {
                return Err(ReviewError::FileNotFound(name.into()));
            };
            if entry.tag == Some(Tag::PendingReview) {
                Ok(entry.name.clone())
            } else {
                Err(ReviewError::NoTarget)
            }
        }
        None => targets.into_iter().next().ok_or(ReviewError::NoTarget),
    }
}

pub fn build_for_listing(listing: &Listing, target: &str) -> String {
    build_prompt(
        target,
        &listing.names_with_tag(Tag::Standard),
        &listing.names_with_tag(Tag::Template),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file_scanner::FileEntry;

    fn entry(name: &str, tag: Option<Tag>) -> FileEntry {
        FileEntry {
            path: name.into(),
            name: name.to_string(),
            tag,
        }
    }

    #[test]
    fn lists_files_per_tag() {
        let prompt = build_prompt(
            "draft.docx",
            &["iso.pdf".to_string(), "policy.pdf".to_string()],
            &["form.docx".to_string()],
        );
        assert!(prompt.starts_with("Using the [Standard] and [Template] documents"));
        assert!(prompt.contains("item by item: draft.docx\n"));
        assert!(prompt.contains("[Standard]\n- iso.pdf\n- policy.pdf\n\n[Template]\n- form.docx\n"));
        assert!(prompt.ends_with("4) Items requiring manual confirmation\n"));
    }

    #[test]
    fn empty_lists_say_none() {
        let prompt = build_prompt("draft.docx", &[], &[]);
        assert!(prompt.contains("[Standard]\n- (none)\n"));
        assert!(prompt.contains("[Template]\n- (none)\n"));
    }

    #[test]
    fn target_resolution() {
        let listing = Listing {
            entries: vec![
                entry("a.docx", Some(Tag::Standard)),
                entry("b.docx", Some(Tag::PendingReview)),
                entry("c.docx", Some(Tag::PendingReview)),
                entry("d.docx", None),
            ],
        };
        assert_eq!(resolve_target(&listing, None).unwrap(), "b.docx");
        assert_eq!(resolve_target(&listing, Some("c.docx")).unwrap(), "c.docx");
        assert!(matches!(
            resolve_target(&listing, Some("a.docx")),
            Err(ReviewError::NoTarget)
        ));
        assert!(matches!(
            resolve_target(&listing, Some("zzz.docx")),
            Err(ReviewError::FileNotFound(_))
        ));
        assert!(matches!(
            resolve_target(&Listing::default(), None),
            Err(ReviewError::NoTarget)
        ));

        let prompt = build_for_listing(&listing, "b.docx");
        assert!(prompt.contains("- a.docx"));
        assert!(prompt.contains("[Template]\n- (none)"));
    }
}
