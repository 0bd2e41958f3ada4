//! Method registry: names, access requirements and retry policy.

use std::collections::HashMap;
use std::sync::LazyLock;

/// Every dispatchable method.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    CheckUser,
    Search,
    CreateUser,
    KeyIn,
    SignIn,
    SignOut,
    LoadProfile,
    UpdateProfile,
    RegisterMedia,
    Follow,
    Unfollow,
    IndexFollowers,
    IndexFollowing,
    OpenFeed,
    CloseFeed,
    CreatePost,
    IndexPosts,
    LoadPost,
    IndexReplies,
    PromotePost,
    CreateReport,
    IndexReports,
    CreateTopic,
    LoadTopic,
    LoadIntegrity,
    LoadBalance,
    IndexTransactions,
    CreateTransaction,
    IndexNotifications,
}

/// Method metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodInfo {
    /// Wire name.
    pub name: &'static str,
    /// Dispatch tag.
    pub method: Method,
    /// Needs a signed-in session.
    pub requires_auth: bool,
    /// `HistoryTimeout` failures are retried.
    pub retryable: bool,
}

impl MethodInfo {
    const fn public(name: &'static str, method: Method) -> Self {
        Self {
            name,
            method,
            requires_auth: false,
            retryable: false,
        }
    }

    const fn signed(name: &'static str, method: Method) -> Self {
        Self {
            name,
            method,
            requires_auth: true,
            retryable: false,
        }
    }

    const fn retrying(self) -> Self {
        Self {
            retryable: true,
            ..self
        }
    }
}

static METHOD_REGISTRY: LazyLock<HashMap<&'static str, MethodInfo>> = LazyLock::new(|| {
    let methods = [
        MethodInfo::public("check user", Method::CheckUser),
        MethodInfo::public("search", Method::Search),
        MethodInfo::public("create user", Method::CreateUser),
        MethodInfo::public("key in", Method::KeyIn).retrying(),
        MethodInfo::public("sign in", Method::SignIn).retrying(),
        MethodInfo::signed("sign out", Method::SignOut),
        MethodInfo::public("load profile", Method::LoadProfile),
        MethodInfo::signed("update profile", Method::UpdateProfile),
        MethodInfo::signed("register media", Method::RegisterMedia),
        MethodInfo::signed("follow", Method::Follow),
        MethodInfo::signed("unfollow", Method::Unfollow),
        MethodInfo::public("index followers", Method::IndexFollowers),
        MethodInfo::public("index following", Method::IndexFollowing),
        MethodInfo::signed("feed", Method::OpenFeed),
        MethodInfo::signed("close feed", Method::CloseFeed),
        MethodInfo::signed("create post", Method::CreatePost),
        MethodInfo::public("index posts", Method::IndexPosts),
        MethodInfo::public("load post", Method::LoadPost),
        MethodInfo::public("index replies", Method::IndexReplies),
        MethodInfo::signed("promote post", Method::PromotePost),
        MethodInfo::signed("create report", Method::CreateReport),
        MethodInfo::public("index reports", Method::IndexReports),
        MethodInfo::signed("create topic", Method::CreateTopic),
        MethodInfo::public("load topic", Method::LoadTopic),
        MethodInfo::public("load integrity", Method::LoadIntegrity),
        MethodInfo::public("load balance", Method::LoadBalance),
        MethodInfo::public("index transactions", Method::IndexTransactions),
        MethodInfo::signed("create transaction", Method::CreateTransaction),
        MethodInfo::signed("index notifications", Method::IndexNotifications),
    ];
    methods.into_iter().map(|m| (m.name, m)).collect()
});

/// Metadata for `name`.
pub fn get_method_info(name: &str) -> Option<&'static MethodInfo> {
    METHOD_REGISTRY.get(name)
}

/// Whether `name` is dispatchable.
pub fn is_method_supported(name: &str) -> bool {
    METHOD_REGISTRY.contains_key(name)
}
