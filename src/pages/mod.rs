use crate::components::ui::{
    Button, ButtonSize, ButtonVariant, Card, CardContent, CardDescription, CardFooter, CardHeader,
    CardTitle,
};
use crate::editor::{use_tag_editor, PlacedTags, TagEditor};
use crate::state::TagEditorState;
use leptos::prelude::*;
use leptos_router::hooks::{use_location, use_navigate};

/// (route, title) of every story.
pub(crate) const STORIES: [(&str, &str); 2] = [
    ("/", "Default"),
    ("/predefined", "With predefined tags"),
];

pub(crate) const PREDEFINED_TAGS: [&str; 2] = ["ask-ai", "perplexity"];

#[component]
fn StoryNav() -> impl IntoView {
    let navigate = StoredValue::new(use_navigate());
    let pathname = use_location().pathname;

    view! {
        <nav class="flex items-center gap-2">
            {STORIES
                .iter()
                .map(|&(path, title)| {
                    let active = move || pathname.get() == path;
                    view! {
                        <Button
                            variant=ButtonVariant::Outline
                            size=ButtonSize::Sm
                            attr:aria-current=move || active().then_some("page")
                            on:click=move |_| navigate.with_value(|nav| nav(path, Default::default()))
                        >
                            {title}
                        </Button>
                    }
                })
                .collect_view()}
        </nav>
    }
}

#[component]
fn StoryFrame(
    #[prop(into)] title: String,
    #[prop(into)] description: String,
    state: RwSignal<TagEditorState>,
) -> impl IntoView {
    let free_text = move || state.with(|s| s.input_value.clone());

    view! {
        <div class="mx-auto flex max-w-3xl flex-col gap-4 px-4 py-8">
            <StoryNav />
            <Card>
                <CardHeader>
                    <CardTitle>{title}</CardTitle>
                    <CardDescription>{description}</CardDescription>
                </CardHeader>
                <CardContent>
                    <TagEditor state=state />
                    <PlacedTags state=state />
                </CardContent>
                <CardFooter>
                    <span class="text-xs text-muted-foreground">"Free text:"</span>
                    <pre class="min-w-0 flex-1 truncate text-xs">{free_text}</pre>
                </CardFooter>
            </Card>
        </div>
    }
}

#[component]
pub fn DefaultStory() -> impl IntoView {
    let state = use_tag_editor(&[]);

    view! {
        <StoryFrame
            title="Tags / Default"
            description="Type, or drag a suggestion into the text."
            state=state
        />
    }
}

#[component]
pub fn PredefinedTagsStory() -> impl IntoView {
    let initial: Vec<String> = PREDEFINED_TAGS.iter().map(|s| s.to_string()).collect();
    let state = use_tag_editor(&initial);

    view! {
        <StoryFrame
            title="Tags / With predefined tags"
            description="Starts with two placed chips; drag them around or delete them."
            state=state
        />
    }
}
