//! Code block header: icon, language label, title and copy button.
//!
//! The [`HeaderModel`] is shared by both surfaces; the reading surface
//! renders it into the DOM, the live editor hosts it in a widget.

use fence_deco_config::Icon;

use crate::context::DecorationEnv;
use crate::dom::{Dom, NodeId};
use crate::parsing::FenceParameters;

pub const HEADER_CLASS: &str = "fence-deco-header";
pub const ICON_CLASS: &str = "fence-deco-icon";
pub const LANGUAGE_CLASS: &str = "fence-deco-lang";
pub const TITLE_CLASS: &str = "fence-deco-title";
pub const COPY_CLASS: &str = "fence-deco-copy";

const DEFAULT_ICON_SIZE: u32 = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderModel {
    /// Canonical language key, or the raw token if unknown.
    pub language: String,
    pub label: String,
    pub title: String,
    pub icon: Option<Icon>,
    pub icon_size: u32,
    pub lang_color: String,
    pub title_color: String,
    pub border_color: String,
    pub show_copy: bool,
}

/// Resolves colors and labels for a block.
///
/// Fence directives win, then the language config (exact key, then
/// alias), then the configured default color.
pub fn header_model(params: &FenceParameters, env: &DecorationEnv<'_>) -> HeaderModel {
    let resolved = env.languages.resolve(&params.language);
    let config = resolved.map(|r| r.config);

    let config_color = config.map(|c| c.color.as_str()).filter(|c| !c.is_empty());
    let lang_color = if params.lang_color.is_empty() {
        config_color
            .unwrap_or(env.settings.default_color.as_str())
            .to_string()
    } else {
        params.lang_color.clone()
    };
    let title_color = if params.title_color.is_empty() {
        config
            .and_then(|c| c.title_color.clone())
            .unwrap_or_else(|| lang_color.clone())
    } else {
        params.title_color.clone()
    };
    let border_color = config
        .and_then(|c| c.border_color.clone())
        .unwrap_or_else(|| lang_color.clone());

    let icon = if env.settings.show_language_icon {
        config
            .and_then(|c| c.icon.as_deref())
            .and_then(|id| env.icons.icon(id))
            .cloned()
    } else {
        None
    };

    HeaderModel {
        language: resolved
            .map(|r| r.key.to_string())
            .unwrap_or_else(|| params.language.clone()),
        label: resolved
            .map(|r| r.display_name().to_string())
            .unwrap_or_else(|| params.language.clone()),
        title: params.title.clone(),
        icon,
        icon_size: config.and_then(|c| c.icon_size).unwrap_or(DEFAULT_ICON_SIZE),
        lang_color,
        title_color,
        border_color,
        show_copy: env.settings.show_copy_button,
    }
}

/// Creates a detached header element for `model`.
pub fn render_header(dom: &mut Dom, model: &HeaderModel) -> NodeId {
    let header = dom.create_element_with_class("div", HEADER_CLASS);
    apply_header(dom, header, model);
    header
}

/// Rewrites the text and colors of an existing header. The copy button
/// node survives so its state is kept.
pub fn apply_header(dom: &mut Dom, header: NodeId, model: &HeaderModel) {
    let copy = dom.find_child(header, |d, n| d.has_class(n, COPY_CLASS));
    dom.clear_children(header);
    dom.set_style(header, "border-color", &model.border_color);
    if model.language.is_empty() {
        dom.remove_attr(header, "data-language");
    } else {
        dom.set_attr(header, "data-language", &model.language);
    }

    if let Some(icon) = &model.icon {
        let span = dom.create_element_with_class("span", ICON_CLASS);
        let size = format!("{}px", model.icon_size);
        dom.set_style(span, "width", &size);
        dom.set_style(span, "height", &size);
        let url = format!("url(\"{}\")", icon.data_url);
        if icon.is_colored {
            dom.set_style(span, "background-image", &url);
            dom.set_style(span, "background-size", &icon.background_size);
        } else {
            dom.set_style(span, "mask-image", &url);
            dom.set_style(span, "mask-size", &icon.background_size);
            dom.set_style(span, "background-color", &model.lang_color);
        }
        dom.append_child(header, span);
    }

    if !model.label.is_empty() {
        let label = dom.create_element_with_class("span", LANGUAGE_CLASS);
        dom.set_text(label, &model.label);
        dom.set_style(label, "color", &model.lang_color);
        dom.append_child(header, label);
    }

    if !model.title.is_empty() {
        let title = dom.create_element_with_class("span", TITLE_CLASS);
        dom.set_text(title, &model.title);
        dom.set_style(title, "color", &model.title_color);
        dom.append_child(header, title);
    }

    match (model.show_copy, copy) {
        (true, Some(button)) => dom.append_child(header, button),
        (true, None) => {
            let button = dom.create_element_with_class("button", COPY_CLASS);
            dom.set_attr(button, "aria-label", "Copy code");
            dom.set_text(button, super::copy::IDLE_LABEL);
            dom.append_child(header, button);
        }
        (false, _) => {}
    }
}
