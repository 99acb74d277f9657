//! Browser host smoke tests

#[cfg(target_arch = "wasm32")]
mod wasm_tests {
	use folio_enhance::EnhanceConfig;
	use folio_enhance::host::Host;
	use folio_enhance::links::harden_external_links;
	use folio_enhance::reveal::stagger_cards;
	use folio_enhance::web::WebHost;
	use wasm_bindgen::JsCast;
	use wasm_bindgen_test::*;
	use web_sys::{Element, HtmlElement};

	wasm_bindgen_test_configure!(run_in_browser);

	fn append(tag: &str, attributes: &[(&str, &str)]) -> Element {
		let document = web_sys::window().unwrap().document().unwrap();
		let element = document.create_element(tag).unwrap();
		for (name, value) in attributes {
			element.set_attribute(name, value).unwrap();
		}
		document.body().unwrap().append_child(&element).unwrap();
		element
	}

	#[wasm_bindgen_test]
	fn test_web_host_class_toggles() {
		let host = WebHost::new().unwrap();
		let element = append("div", &[("id", "toggle-target")]);

		host.set_class(&element, "animate-in", true).unwrap();
		assert!(host.has_class(&element, "animate-in"));

		host.set_class(&element, "animate-in", false).unwrap();
		assert!(!host.has_class(&element, "animate-in"));
		assert_eq!(host.element_by_id("toggle-target"), Some(element));
	}

	#[wasm_bindgen_test]
	fn test_web_host_staggers_cards() {
		let host = WebHost::new().unwrap();
		let mut config = EnhanceConfig::default();
		config.selectors.project_card = ".wasm-card".to_string();
		let cards: Vec<Element> = (0..2)
			.map(|_| append("div", &[("class", "wasm-card")]))
			.collect();

		assert_eq!(stagger_cards(&host, &config).unwrap(), 2);

		let second: &HtmlElement = cards[1].dyn_ref().unwrap();
		assert_eq!(
			second.style().get_property_value("transition-delay").unwrap(),
			"0.1s"
		);
	}

	#[wasm_bindgen_test]
	fn test_web_host_hardens_links() {
		let host = WebHost::new().unwrap();
		let mut config = EnhanceConfig::default();
		config.selectors.external_link = "a[data-wasm-external]".to_string();
		let link = append(
			"a",
			&[("href", "https://example.org/"), ("target", "_blank"), ("data-wasm-external", "")],
		);

		assert_eq!(harden_external_links(&host, &config).unwrap(), 1);
		assert_eq!(link.get_attribute("rel").as_deref(), Some("noopener noreferrer"));
	}
}
