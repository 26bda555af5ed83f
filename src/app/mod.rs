use crate::pages::{DefaultStory, PredefinedTagsStory};
use leptos::prelude::*;
use leptos_router::components::{Route, Router, Routes};
use leptos_router::path;

#[component]
pub fn App() -> impl IntoView {
    // IMPORTANT:
    // - Leptos CSR requires the `csr` feature on `leptos`.
    // - router hooks (story navigation) require a <Router> context.
    view! {
        <Router>
            <Routes fallback=|| view! { <div class="px-4 py-8 text-xs text-muted-foreground">"Not found"</div> }>
                <Route path=path!("predefined") view=PredefinedTagsStory />
                <Route path=path!("") view=DefaultStory />
            </Routes>
        </Router>
    }
}
