mod dom;

use crate::components::hooks::use_random::use_random_id_for;
use crate::components::ui::{Button, ButtonSize, ButtonVariant};
use crate::config::TagEditorConfig;
use crate::geometry::Point;
use crate::models::{find_suggestion, DragPayload, TagInstanceId};
use crate::state::{DropOutcome, TagEditorState, TagRef};
use icons::X;
use leptos::html;
use leptos::logging::{log, warn};
use leptos::prelude::*;
use leptos_ui::clx;
use tw_merge::tw_merge;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;

mod components {
    use super::*;
    clx! {SuggestionPanel, div, "flex w-44 flex-col gap-1 rounded-md border bg-background p-1 text-sm shadow-md"}
    clx! {SuggestionIcon, span, "suggestion-icon text-base leading-none"}
    clx! {PlaceholderText, span, "pointer-events-none absolute left-3 top-2 text-sm text-muted-foreground select-none"}
}

#[allow(unused_imports)]
pub use components::*;

#[derive(Clone, Copy, strum::AsRefStr)]
#[strum(serialize_all = "lowercase")]
enum DropEffect {
    Copy,
    Move,
}

/// Editor state configured from `window.TAG_EDITOR`, seeded with one chip per
/// known suggestion id.
pub fn use_tag_editor(initial_tags: &[String]) -> RwSignal<TagEditorState> {
    RwSignal::new(TagEditorState::with_initial_tags(
        TagEditorConfig::from_window(),
        initial_tags,
    ))
}

fn chip_under(target: Option<web_sys::EventTarget>) -> Option<web_sys::Element> {
    target?
        .dyn_into::<web_sys::Element>()
        .ok()?
        .closest(dom::CHIP_SELECTOR)
        .ok()
        .flatten()
}

fn pointer(ev: &web_sys::DragEvent) -> Point {
    Point::new(ev.client_x() as f64, ev.client_y() as f64)
}

#[component]
pub fn TagEditor(
    #[prop(into, optional)] class: String,
    /// Shared editor state; a fresh one is created when absent.
    #[prop(optional)]
    state: Option<RwSignal<TagEditorState>>,
) -> impl IntoView {
    let state = state.unwrap_or_else(|| use_tag_editor(&[]));

    let root_ref: NodeRef<html::Div> = NodeRef::new();
    let surface_ref: NodeRef<html::Div> = NodeRef::new();
    let blur_timer: StoredValue<Option<i32>> = StoredValue::new(None);
    let panel_id = use_random_id_for("tag_suggestions");
    let panel_id_for_panel = panel_id.clone();

    let (placeholder, blur_grace_ms, suggestions) = state.with_untracked(|s| {
        let cfg = s.config();
        (cfg.placeholder.clone(), cfg.blur_grace_timeout(), cfg.suggestions.clone())
    });

    // Memos so the continuous dragover updates only touch what changed.
    let revision = Memo::new(move |_| state.with(|s| s.revision()));
    let hover_line = Memo::new(move |_| state.with(|s| s.hover_line));
    let show_suggestions = Memo::new(move |_| state.with(|s| s.show_suggestions));
    let is_empty = Memo::new(move |_| state.with(|s| s.document.is_empty()));

    // The surface is re-derived from the model whenever an edit bumps the revision.
    Effect::new(move |_| {
        let _ = revision.get();
        let Some(surface) = surface_ref.get() else {
            return;
        };
        let (doc, caret) = state.with_untracked(|s| (s.document.clone(), s.caret));
        if let Err(e) = dom::render(&surface, &doc) {
            warn!("tag editor: render failed: {e:?}");
            return;
        }
        if let Some(pos) = caret {
            let _ = dom::place_caret(&surface, pos);
        }
    });

    let cancel_blur_timer = move || {
        // `try_` because cleanup may run after the owner's values are gone.
        if let Some(handle) = blur_timer.try_update_value(|h| h.take()).flatten() {
            if let Some(window) = web_sys::window() {
                window.clear_timeout_with_handle(handle);
            }
        }
    };
    on_cleanup(cancel_blur_timer);

    let reveal = move || {
        cancel_blur_timer();
        state.update(|s| s.reveal_suggestions());
    };

    let on_blur = move |ev: web_sys::FocusEvent| {
        let focus_within = match (root_ref.get_untracked(), ev.related_target()) {
            (Some(root), Some(next)) => next
                .dyn_ref::<web_sys::Node>()
                .is_some_and(|n| root.contains(Some(n))),
            _ => false,
        };
        let Some(ticket) = state.try_update(|s| s.blur(focus_within)).flatten() else {
            return;
        };

        cancel_blur_timer();
        let Some(window) = web_sys::window() else {
            return;
        };
        // Grace period so a drag that just left the surface can still land.
        let hide = Closure::once_into_js(move || {
            let pointer_over = surface_ref
                .get_untracked()
                .and_then(|el| el.matches(":hover").ok())
                .unwrap_or(false);
            let _ = state.try_update(|s| s.fire_blur_hide(ticket, pointer_over));
        });
        if let Ok(handle) = window.set_timeout_with_callback_and_timeout_and_arguments_0(
            hide.as_ref().unchecked_ref(),
            blur_grace_ms,
        ) {
            blur_timer.set_value(Some(handle));
        }
    };

    let on_keydown = move |ev: web_sys::KeyboardEvent| {
        if ev.key() != "Enter" {
            return;
        }
        ev.prevent_default();
        let Some(surface) = surface_ref.get_untracked() else {
            return;
        };
        let pos = dom::selection_position(&surface)
            .unwrap_or_else(|| state.with_untracked(|s| s.document.len()));
        state.update(|s| {
            s.enter(pos);
        });
    };

    let on_input = move |_ev: web_sys::Event| {
        let Some(surface) = surface_ref.get_untracked() else {
            return;
        };
        let doc = dom::read_back(&surface);
        let caret = dom::selection_position(&surface);
        state.update(|s| s.sync_from_surface(doc, caret));
    };

    let on_dragover = move |ev: web_sys::DragEvent| {
        ev.prevent_default();
        let Some(surface) = surface_ref.get_untracked() else {
            return;
        };
        let layout = dom::DomLayout::new(surface.into());
        state.update(|s| {
            s.drag_over(pointer(&ev), &layout);
        });
    };

    let on_drop = move |ev: web_sys::DragEvent| {
        ev.prevent_default();
        let raw = ev
            .data_transfer()
            .and_then(|dt| dt.get_data(DragPayload::MIME).ok())
            .unwrap_or_default();
        let Some(surface) = surface_ref.get_untracked() else {
            return;
        };
        let layout = dom::DomLayout::new(surface.into());

        match state.try_update(|s| s.drop(&raw, pointer(&ev), &layout)) {
            Some(Ok(DropOutcome::Inserted(id))) => log!("tag editor: placed {id}"),
            Some(Ok(DropOutcome::Moved(id))) => log!("tag editor: moved {id}"),
            Some(Err(e)) => warn!("tag editor: ignored drop: {e}"),
            None => {}
        }
    };

    // Chips are plain nodes built by the renderer, so their drag handling is
    // delegated to the surface.
    let on_dragstart = move |ev: web_sys::DragEvent| {
        let Some(chip) = chip_under(ev.target()) else {
            return;
        };
        let Some(id) = chip.get_attribute(dom::CHIP_ID_ATTR) else {
            return;
        };
        ev.stop_propagation();
        if let Some(dt) = ev.data_transfer() {
            let payload = DragPayload::Internal(TagInstanceId::from(id.as_str()));
            let _ = dt.set_data(DragPayload::MIME, &payload.encode());
            dt.set_effect_allowed(DropEffect::Move.as_ref());
        }
    };

    let merged_class = tw_merge!("flex flex-row-reverse items-start gap-2", class);

    view! {
        <div data-name="TagEditor" class=merged_class node_ref=root_ref>
            <div class="relative flex-1">
                <div
                    node_ref=surface_ref
                    class="tag-container min-h-[100px] w-full rounded-md border border-input bg-transparent px-3 py-2 text-sm whitespace-pre-wrap break-words outline-none focus-visible:ring-2 focus-visible:ring-ring/50"
                    contenteditable="true"
                    aria-controls=panel_id
                    on:focus=move |_| reveal()
                    on:mouseenter=move |_| reveal()
                    on:blur=on_blur
                    on:keydown=on_keydown
                    on:input=on_input
                    on:dragstart=on_dragstart
                    on:dragover=on_dragover
                    on:dragleave=move |_| state.update(|s| s.drag_leave())
                    on:drop=on_drop
                ></div>

                <Show when=move || is_empty.get() fallback=|| ().into_view()>
                    {
                        let placeholder = placeholder.clone();
                        view! { <PlaceholderText>{placeholder}</PlaceholderText> }
                    }
                </Show>

                <Show when=move || hover_line.get().show fallback=|| ().into_view()>
                    <div
                        class="pointer-events-none absolute inset-x-0 border-t-2 border-muted-foreground"
                        style=move || format!("top: {}px", hover_line.get().top)
                    ></div>
                </Show>
            </div>

            <Show when=move || show_suggestions.get() fallback=|| ().into_view()>
                {
                    let panel_id = panel_id_for_panel.clone();
                    let items = suggestions
                        .clone()
                        .into_iter()
                        .map(|s| {
                            let payload = DragPayload::Suggestion(s.clone()).encode();
                            view! {
                                <div
                                    class="suggestion-item flex cursor-grab items-center gap-2 rounded px-2 py-1 hover:bg-muted"
                                    draggable="true"
                                    on:dragstart=move |ev: web_sys::DragEvent| {
                                        if let Some(dt) = ev.data_transfer() {
                                            let _ = dt.set_data(DragPayload::MIME, &payload);
                                            dt.set_effect_allowed(DropEffect::Copy.as_ref());
                                        }
                                    }
                                >
                                    <SuggestionIcon>{s.icon.clone()}</SuggestionIcon>
                                    {s.label.clone()}
                                </div>
                            }
                        })
                        .collect_view();
                    view! { <SuggestionPanel attr:id=panel_id>{items}</SuggestionPanel> }
                }
            </Show>
        </div>
    }
}

/// Placed tags with a delete button each.
#[component]
pub fn PlacedTags(
    state: RwSignal<TagEditorState>,
    #[prop(into, optional)] class: String,
) -> impl IntoView {
    let tags = Memo::new(move |_| {
        state.with(|s| {
            s.tags
                .iter()
                .map(|t| {
                    let (icon, label) = find_suggestion(s.suggestions(), &t.suggestion_id)
                        .map(|sug| (sug.icon.clone(), sug.label.clone()))
                        .unwrap_or_else(|| (String::new(), t.suggestion_id.clone()));
                    (t.instance.clone(), icon, label)
                })
                .collect::<Vec<_>>()
        })
    });

    let merged_class = tw_merge!("flex flex-wrap items-center gap-2 text-xs", class);

    view! {
        <div data-name="PlacedTags" class=merged_class>
            <Show
                when=move || !tags.with(|t| t.is_empty())
                fallback=|| view! { <span class="text-muted-foreground">"No tags placed yet."</span> }
            >
                <For
                    each=move || tags.get()
                    key=|(id, _, _)| id.clone()
                    children=move |(id, icon, label)| {
                        view! {
                            <span class="inline-flex items-center gap-1 rounded-md border px-1.5 py-0.5">
                                <span>{icon}</span>
                                <span>{label}</span>
                                <Button
                                    variant=ButtonVariant::Ghost
                                    size=ButtonSize::Icon
                                    class="size-5"
                                    attr:title="Remove tag"
                                    on:click=move |_| {
                                        state.update(|s| {
                                            s.delete_tag(&TagRef::Instance(id.clone()));
                                        });
                                    }
                                >
                                    <X class="size-3" />
                                </Button>
                            </span>
                        }
                    }
                />
            </Show>
        </div>
    }
}
