//! Browser tests for the DOM console view.
//!
//! Run with: `wasm-pack test --headless --firefox crates/myo-web`

#![cfg(target_arch = "wasm32")]

use myo_types::{ConsoleView, dispatch};
use myo_web::DomView;
use wasm_bindgen::JsCast;
use wasm_bindgen_test::*;
use web_sys::{Document, HtmlImageElement};

wasm_bindgen_test_configure!(run_in_browser);

fn document() -> Document {
    web_sys::window().unwrap().document().unwrap()
}

fn add_element(tag: &str, id: &str) {
    let document = document();
    let element = document.create_element(tag).unwrap();
    element.set_id(id);
    document.body().unwrap().append_child(&element).unwrap();
}

#[wasm_bindgen_test]
fn output_motion_updates_all_panels() {
    for id in ["main_output", "mt_output", "tac_output"] {
        add_element("span", id);
    }
    let mut view = DomView::new(document());

    assert!(dispatch(&mut view, "strOutputMotion", "Hand Open"));

    for id in ["main_output", "mt_output", "tac_output"] {
        let element = document().get_element_by_id(id).unwrap();
        assert_eq!(element.text_content().as_deref(), Some("Hand Open"));
    }
}

#[wasm_bindgen_test]
fn progress_sets_width_and_label() {
    add_element("div", "mtProgressBar");
    add_element("span", "mtProgressLabel");
    let mut view = DomView::new(document());

    assert!(dispatch(&mut view, "strMotionTesterProgress", "42"));
    assert_eq!(view.style("mtProgressBar", "width").as_deref(), Some("42%"));
}

#[wasm_bindgen_test]
fn image_source_is_replaced() {
    add_element("img", "ID_MT_IMAGE");
    let mut view = DomView::new(document());

    view.set_image("ID_MT_IMAGE", "img_grasps/Hand_Open.png");

    let image: HtmlImageElement = document()
        .get_element_by_id("ID_MT_IMAGE")
        .unwrap()
        .dyn_into()
        .unwrap();
    assert!(image.src().ends_with("img_grasps/Hand_Open.png"));
}

#[wasm_bindgen_test]
fn missing_elements_are_skipped() {
    let mut view = DomView::new(document());
    assert!(dispatch(&mut view, "strTAC", "Running"));
    assert_eq!(view.style("tac_status", "width"), None);
}
