//! 模板构建与还原集成测试

mod common;

//  ██████╗  █████╗ ███████╗███████╗██╗███╗   ██╗ ██████╗
//  ██╔══██╗██╔══██╗██╔════╝██╔════╝██║████╗  ██║██╔════╝
//  ██████╔╝███████║███████╗███████╗██║██╔██╗ ██║██║  ███╗
//  ██╔═══╝ ██╔══██║╚════██║╚════██║██║██║╚██╗██║██║   ██║
//  ██║     ██║  ██║███████║███████║██║██║ ╚████║╚██████╔╝
//  ╚═╝     ╚═╝  ╚═╝╚══════╝╚══════╝╚═╝╚═╝  ╚═══╝ ╚═════╝

#[cfg(test)]
mod passing {
    use itemplate::{
        process_element, restore_element, AttributeKind, ContentElement, ExtractionConfig,
        TemplateBuilder,
    };

    use crate::common::{placeholder as ph, sample_fragments, sequential_store};

    #[test]
    fn scenario_shares_token_between_src_and_srcset() {
        let store = sequential_store();
        let config = ExtractionConfig::default();
        let element = ContentElement::new(
            "page-1",
            r#"<img src="x.jpg" alt="Cat" srcset="x.jpg 1x, y.jpg 2x">"#,
        );

        let outcome = process_element(&store, &config, &element).unwrap();

        assert_eq!(outcome.items.len(), 3);
        assert_eq!(outcome.created, 3);
        assert_eq!(
            outcome.template.body,
            format!(
                r#"<img src="{a}" alt="{b}" srcset="{a} 1x, {c} 2x">"#,
                a = ph(1),
                b = ph(2),
                c = ph(3)
            )
        );
        assert!(outcome.template.is_complete());
    }

    #[test]
    fn srcset_urls_get_one_placeholder_each() {
        let store = sequential_store();
        let config = ExtractionConfig::default();
        let element = ContentElement::new(
            "gallery",
            r#"<img srcset="a.jpg 200w, b.jpg 400w, c.jpg 800w">"#,
        );

        let outcome = process_element(&store, &config, &element).unwrap();

        assert!(outcome
            .items
            .iter()
            .all(|item| item.attribute_kind == AttributeKind::Srcset));
        assert_eq!(
            outcome.template.body,
            format!(
                r#"<img srcset="{} 200w, {} 400w, {} 800w">"#,
                ph(1),
                ph(2),
                ph(3)
            )
        );
    }

    #[test]
    fn shorter_value_does_not_corrupt_longer() {
        let store = sequential_store();
        let config = ExtractionConfig::default();
        let element = ContentElement::new("cats", r#"<img alt="cat"><img alt="cat picture">"#);

        let outcome = process_element(&store, &config, &element).unwrap();

        assert_eq!(
            outcome.template.body,
            format!(r#"<img alt="{}"><img alt="{}">"#, ph(1), ph(2))
        );
    }

    #[test]
    fn less_than_inside_alt_is_templated_and_restored() {
        let store = sequential_store();
        let config = ExtractionConfig::default();
        let body = r#"<img src="chart.png" alt="x < y">"#;
        let element = ContentElement::new("chart", body);

        let outcome = process_element(&store, &config, &element).unwrap();

        assert_eq!(outcome.items.len(), 2);
        assert_eq!(
            outcome.template.body,
            format!(r#"<img src="{}" alt="{}">"#, ph(1), ph(2))
        );
        let restored = restore_element(&store, &config, "chart", &outcome.template.body).unwrap();
        assert_eq!(restored.body, body);
    }

    #[test]
    fn markup_inside_title_is_templated_and_restored() {
        let store = sequential_store();
        let config = ExtractionConfig::default();
        let body = r#"<a href="/q" title="a<b>c">q</a><img src="z.png">"#;
        let element = ContentElement::new("markup", body);

        let outcome = process_element(&store, &config, &element).unwrap();

        assert_eq!(
            outcome.template.body,
            format!(
                r#"<a href="{}" title="{}">q</a><img src="{}">"#,
                ph(1),
                ph(2),
                ph(3)
            )
        );
        let restored = restore_element(&store, &config, "markup", &outcome.template.body).unwrap();
        assert_eq!(restored.body, body);
    }

    #[test]
    fn every_sample_restores_exactly() {
        let config = ExtractionConfig::default();

        for (i, body) in sample_fragments().into_iter().enumerate() {
            let store = sequential_store();
            let content_id = format!("sample-{}", i);
            let element = ContentElement::new(content_id.as_str(), body);

            let outcome = process_element(&store, &config, &element).unwrap();
            let restored =
                restore_element(&store, &config, &content_id, &outcome.template.body).unwrap();

            assert_eq!(restored.body, body, "sample {}", i);
            assert!(restored.unresolved.is_empty());
        }
    }

    #[test]
    fn no_value_leaks_into_templates() {
        let config = ExtractionConfig::default();
        let builder = TemplateBuilder::new(&config);

        for (i, body) in sample_fragments().into_iter().enumerate() {
            let store = sequential_store();
            let element = ContentElement::new(format!("sample-{}", i), body);

            let outcome = process_element(&store, &config, &element).unwrap();

            assert!(builder
                .leaked_items(&outcome.template.body, &outcome.items)
                .is_empty());
            for item in outcome.items.iter().filter(|item| item.value.len() >= 3) {
                assert!(
                    !outcome.template.body.contains(&item.value),
                    "sample {} leaks {:?}",
                    i,
                    item.value
                );
            }
        }
    }

    #[test]
    fn irregular_srcset_restores_to_normalized_form() {
        let store = sequential_store();
        let config = ExtractionConfig::default();
        let body = "<img srcset=\"a.jpg   1x,\n    b.jpg 2x,\" alt=\"A\">";
        let element = ContentElement::new("irregular", body);

        let outcome = process_element(&store, &config, &element).unwrap();
        let restored = restore_element(&store, &config, "irregular", &outcome.template.body).unwrap();

        assert_eq!(restored.body, r#"<img srcset="a.jpg 1x, b.jpg 2x" alt="A">"#);
        let builder = TemplateBuilder::new(&config);
        assert_eq!(builder.normalize(body), restored.body);
    }

    #[test]
    fn stored_items_keep_templates_stable() {
        let store = sequential_store();
        let config = ExtractionConfig::default();
        let element = ContentElement::new("stable", r#"<a href="/home" title="Home">Home</a>"#);

        let first = process_element(&store, &config, &element).unwrap();
        let second = process_element(&store, &config, &element).unwrap();

        assert_eq!(second.created, 0);
        assert_eq!(first.template.body, second.template.body);
    }

    #[test]
    fn custom_placeholder_prefix() {
        let store = sequential_store();
        let config = ExtractionConfig::default().with_placeholder_prefix("ref-");
        let element = ContentElement::new("prefixed", r#"<a href="/x">x</a>"#);

        let outcome = process_element(&store, &config, &element).unwrap();
        let expected = format!("ref-{}", crate::common::token(1).hyphenated());

        assert_eq!(outcome.template.body, format!(r#"<a href="{}">x</a>"#, expected));
        assert_eq!(
            restore_element(&store, &config, "prefixed", &outcome.template.body)
                .unwrap()
                .body,
            r#"<a href="/x">x</a>"#
        );
    }
}

//  ███████╗ █████╗ ██╗██╗     ██╗███╗   ██╗ ██████╗
//  ██╔════╝██╔══██╗██║██║     ██║████╗  ██║██╔════╝
//  █████╗  ███████║██║██║     ██║██╔██╗ ██║██║  ███╗
//  ██╔══╝  ██╔══██║██║██║     ██║██║╚██╗██║██║   ██║
//  ██║     ██║  ██║██║███████╗██║██║ ╚████║╚██████╔╝
//  ╚═╝     ╚═╝  ╚═╝╚═╝╚══════╝╚═╝╚═╝  ╚═══╝ ╚═════╝

#[cfg(test)]
mod failing {
    use itemplate::{
        process_element, restore_element, ContentElement, ExtractionConfig, MissReason,
    };

    use crate::common::{placeholder as ph, sequential_store};

    #[test]
    fn malformed_fragments_never_error() {
        let store = sequential_store();
        let config = ExtractionConfig::default();

        for body in [
            r#"<img src="unterminated alt=x>"#,
            "<img src='x.jpg'",
            "<<<>>> <a href=>",
            "<!-- never closed <img src=\"x.jpg\">",
        ] {
            let element = ContentElement::new("broken", body);
            assert!(process_element(&store, &config, &element).is_ok());
        }
    }

    #[test]
    fn empty_alt_is_reported_as_miss() {
        let store = sequential_store();
        let config = ExtractionConfig::default();
        let element = ContentElement::new("empty", r#"<img src="a.jpg" alt="">"#);

        let outcome = process_element(&store, &config, &element).unwrap();

        assert_eq!(outcome.template.misses.len(), 1);
        assert_eq!(outcome.template.misses[0].reason, MissReason::EmptyValue);
        assert_eq!(
            outcome.template.body,
            format!(r#"<img src="{}" alt="">"#, ph(1))
        );
    }

    #[test]
    fn unknown_placeholders_stay_in_place() {
        let store = sequential_store();
        let config = ExtractionConfig::default();
        let template = format!(r#"<a href="{}">x</a>"#, ph(404));

        let restored = restore_element(&store, &config, "nothing", &template).unwrap();

        assert_eq!(restored.body, template);
        assert_eq!(restored.unresolved, vec![ph(404)]);
        assert_eq!(restored.restored, 0);
    }

    #[test]
    fn empty_body_has_no_items() {
        let store = sequential_store();
        let config = ExtractionConfig::default();

        let outcome = process_element(&store, &config, &ContentElement::new("void", "")).unwrap();

        assert!(outcome.items.is_empty());
        assert_eq!(outcome.template.body, "");
    }
}
