#![allow(non_snake_case)]

use adview_core::api::Backend;
use adview_core::controller::WatchSnapshot;
use adview_core::queue::SortOrder;
use adview_core::types::{Ad, UserProfile};
use dioxus::prelude::*;

// --- Data types ---

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
    Info,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Toast {
    pub id: u64,
    pub message: String,
    pub kind: ToastKind,
}

// --- Global signals ---

/// Ads in queue order, mirrored from the watch controller
pub static ADS: GlobalSignal<Vec<Ad>> = Global::new(Vec::new);

/// Current profile, refreshed on every `ProfileUpdated` / `UserLoggedIn`
pub static PROFILE: GlobalSignal<Option<UserProfile>> = Global::new(|| None);

/// Render state of the open ad, `None` when the modal is closed
pub static WATCH: GlobalSignal<Option<WatchSnapshot>> = Global::new(|| None);

/// Whether a claim request is in flight
pub static CLAIMING: GlobalSignal<bool> = Global::new(|| false);

pub static TOAST: GlobalSignal<Option<Toast>> = Global::new(|| None);

pub static SORT_ORDER: GlobalSignal<SortOrder> = Global::new(SortOrder::default);

/// Backend answering flag-routed actions
pub static BACKEND: GlobalSignal<Backend> = Global::new(Backend::default);

/// Whether the last remote call reached the server
pub static CONNECTED: GlobalSignal<bool> = Global::new(|| false);

pub static LOADING: GlobalSignal<bool> = Global::new(|| false);

/// User-facing message for the last failed ad load
pub static LOAD_ERROR: GlobalSignal<Option<String>> = Global::new(|| None);

pub static DARK_MODE: GlobalSignal<bool> = Global::new(|| false);
