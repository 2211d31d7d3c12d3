//! Validation and display state of the post create/edit form.
//!
//! The form has two fields: the post `text` and an optional `group`. Field
//! kinds are described by [`PostForm::FIELDS`] rather than discovered at
//! runtime, so clients can lay the form out without inspecting values.

use crate::model::{
    Id,
    group::{Group, GroupMarker, GroupTitle},
    post::{Post, PostContent, PostText},
};
use serde::{Deserialize, Deserializer, Serialize, de::IgnoredAny};
use std::collections::BTreeMap;

pub const REQUIRED_MESSAGE: &str = "field required.";
pub const INVALID_CHOICE_MESSAGE: &str =
    "Select a valid choice. That choice is not one of the available choices.";

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldName {
    Text,
    Group,
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Free-form multi-line text.
    Text,
    /// One of the existing groups, or nothing.
    GroupChoice,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct FieldSpec {
    pub name: FieldName,
    pub kind: FieldKind,
    pub required: bool,
    pub label: &'static str,
    pub help_text: &'static str,
    pub placeholder: Option<&'static str>,
}

/// A group choice as submitted: browsers send strings, API clients may send
/// the numeric id directly.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawGroupChoice {
    Id(i64),
    Text(String),
}

/// Unvalidated form submission.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Serialize, Deserialize)]
pub struct PostFormInput {
    #[serde(default, deserialize_with = "text_or_nothing")]
    pub text: Option<String>,
    #[serde(default)]
    pub group: Option<RawGroupChoice>,
}

/// Non-string text counts as missing, so it fails as a field error rather
/// than rejecting the whole submission.
fn text_or_nothing<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    #[allow(dead_code)]
    enum RawText {
        Text(String),
        Other(IgnoredAny),
    }

    Ok(match Option::<RawText>::deserialize(deserializer)? {
        Some(RawText::Text(text)) => Some(text),
        Some(RawText::Other(_)) | None => None,
    })
}

/// Field-level validation messages, keyed by field.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormErrors(BTreeMap<FieldName, Vec<String>>);

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct GroupChoice {
    pub id: Id<GroupMarker>,
    pub title: GroupTitle,
}

/// Everything needed to (re)display the post form.
#[derive(Clone, Eq, PartialEq, Debug, Serialize)]
pub struct PostForm {
    pub fields: &'static [FieldSpec],
    pub values: PostFormInput,
    pub errors: FormErrors,
    pub group_choices: Vec<GroupChoice>,
    pub empty_group_label: &'static str,
}

impl FormErrors {
    pub fn add(&mut self, field: FieldName, message: impl Into<String>) {
        self.0.entry(field).or_default().push(message.into());
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn field(&self, field: FieldName) -> &[String] {
        self.0.get(&field).map_or(&[], Vec::as_slice)
    }
}

impl RawGroupChoice {
    /// `None` for the empty choice, `Some(Err(()))` for something that is not
    /// an id at all.
    fn parse(&self) -> Option<Result<Id<GroupMarker>, ()>> {
        match self {
            RawGroupChoice::Id(id) => Some(Ok(Id::new(*id))),
            RawGroupChoice::Text(raw) => {
                let raw = raw.trim();
                (!raw.is_empty()).then(|| raw.parse().map_err(|_| ()))
            }
        }
    }
}

impl From<&Group> for GroupChoice {
    fn from(group: &Group) -> Self {
        Self {
            id: group.id,
            title: group.title.clone(),
        }
    }
}

impl PostForm {
    pub const FIELDS: &'static [FieldSpec] = &[
        FieldSpec {
            name: FieldName::Text,
            kind: FieldKind::Text,
            required: true,
            label: "Post:",
            help_text: "Write your post and press \"Add\"",
            placeholder: Some("Type some text here, pretty please"),
        },
        FieldSpec {
            name: FieldName::Group,
            kind: FieldKind::GroupChoice,
            required: false,
            label: "Group",
            help_text: "Choosing a group is optional",
            placeholder: None,
        },
    ];

    pub const EMPTY_GROUP_LABEL: &'static str = "Click here to choose a group";

    /// Check a submission against the groups that currently exist.
    ///
    /// Every field is checked, so all problems are reported at once.
    pub fn validate(input: &PostFormInput, groups: &[Group]) -> Result<PostContent, FormErrors> {
        let mut errors = FormErrors::default();

        let text = input.text.as_deref().and_then(|text| PostText::new(text).ok());
        if text.is_none() {
            errors.add(FieldName::Text, REQUIRED_MESSAGE);
        }

        let group = match input.group.as_ref().and_then(RawGroupChoice::parse) {
            None => None,
            Some(Ok(id)) if groups.iter().any(|group| group.id == id) => Some(id),
            Some(_) => {
                errors.add(FieldName::Group, INVALID_CHOICE_MESSAGE);
                None
            }
        };

        match text {
            Some(text) if errors.is_empty() => Ok(PostContent { text, group }),
            _ => Err(errors),
        }
    }

    #[must_use]
    pub fn blank(groups: &[Group]) -> Self {
        Self::bound(PostFormInput::default(), FormErrors::default(), groups)
    }

    /// The form pre-filled with what `post` currently holds.
    #[must_use]
    pub fn from_post(post: &Post, groups: &[Group]) -> Self {
        let values = PostFormInput {
            text: Some(post.text.get().to_owned()),
            group: post
                .group
                .as_ref()
                .map(|group| RawGroupChoice::Id(group.id.get())),
        };
        Self::bound(values, FormErrors::default(), groups)
    }

    #[must_use]
    pub fn bound(values: PostFormInput, errors: FormErrors, groups: &[Group]) -> Self {
        Self {
            fields: Self::FIELDS,
            values,
            errors,
            group_choices: groups.iter().map(GroupChoice::from).collect(),
            empty_group_label: Self::EMPTY_GROUP_LABEL,
        }
    }
}
