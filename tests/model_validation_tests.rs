use cfa_prep::models::{
    AvatarUploadRequest, CategoryRequest, CreateForumRequest, LoginRequest, RegisterRequest, Role,
    UpdateForumRequest, UpdateProfileRequest, User, avatar_prefix, slugify,
};
use uuid::Uuid;

// --- Role ---

#[test]
fn test_role_wire_format() {
    assert_eq!(serde_json::to_string(&Role::SuperAdmin).unwrap(), "\"SUPER_ADMIN\"");
    assert_eq!(
        serde_json::from_str::<Role>("\"ADMIN\"").unwrap(),
        Role::Admin
    );
    assert!(serde_json::from_str::<Role>("\"admin\"").is_err());
    assert!(serde_json::from_str::<Role>("\"OWNER\"").is_err());
}

#[test]
fn test_role_parsing_matches_database_values() {
    for role in [Role::User, Role::Admin, Role::SuperAdmin] {
        assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        assert_eq!(Role::try_from(role.to_string()).unwrap(), role);
    }
    assert!("MODERATOR".parse::<Role>().is_err());
}

#[test]
fn test_admin_like_roles() {
    assert!(!Role::User.is_admin_like());
    assert!(Role::Admin.is_admin_like());
    assert!(Role::SuperAdmin.is_admin_like());
    assert_eq!(Role::default(), Role::User);
}

#[test]
fn test_user_serializes_role_for_the_client() {
    let user = User {
        role: Role::SuperAdmin,
        ..User::default()
    };
    let json = serde_json::to_value(&user).unwrap();
    assert_eq!(json["role"], "SUPER_ADMIN");
}

// --- Registration & Login ---

#[test]
fn test_register_request_validation() {
    let valid = RegisterRequest {
        email: "candidate@example.com".to_string(),
        password: "12345678".to_string(),
        display_name: "Candidate".to_string(),
    };
    assert!(valid.validate().is_ok());

    let bad_email = RegisterRequest {
        email: "not-an-email".to_string(),
        ..valid.clone()
    };
    assert_eq!(bad_email.validate(), Err("email is invalid"));

    let short_password = RegisterRequest {
        password: "1234567".to_string(),
        ..valid.clone()
    };
    assert!(short_password.validate().is_err());

    let blank_name = RegisterRequest {
        display_name: "   ".to_string(),
        ..valid.clone()
    };
    assert_eq!(blank_name.validate(), Err("display_name is required"));

    let long_name = RegisterRequest {
        display_name: "x".repeat(81),
        ..valid
    };
    assert_eq!(long_name.validate(), Err("display_name must be <= 80 chars"));
}

#[test]
fn test_email_shapes() {
    for email in ["a@b.co", " padded@example.com "] {
        let req = LoginRequest {
            email: email.to_string(),
            password: "x".to_string(),
        };
        assert!(req.validate().is_ok(), "email {email}");
    }
    for email in ["", "a@b", "@b.com", "a@@b.com", "a b@c.com", "a@.com", "a@com."] {
        let req = LoginRequest {
            email: email.to_string(),
            password: "x".to_string(),
        };
        assert!(req.validate().is_err(), "email {email}");
    }
}

#[test]
fn test_login_requires_password() {
    let req = LoginRequest {
        email: "a@b.co".to_string(),
        password: String::new(),
    };
    assert_eq!(req.validate(), Err("password is required"));
}

// --- Profile & Avatars ---

#[test]
fn test_profile_update_avatar_must_be_own() {
    let id = Uuid::new_v4();

    let own = UpdateProfileRequest {
        avatar_key: Some(format!("{}photo.webp", avatar_prefix(id))),
        ..Default::default()
    };
    assert!(own.validate(id).is_ok());

    let foreign = UpdateProfileRequest {
        avatar_key: Some(format!("{}photo.webp", avatar_prefix(Uuid::new_v4()))),
        ..Default::default()
    };
    assert!(foreign.validate(id).is_err());

    assert!(UpdateProfileRequest::default().validate(id).is_ok());
}

#[test]
fn test_avatar_upload_request_must_be_image() {
    let ok = AvatarUploadRequest {
        filename: "me.jpg".to_string(),
        file_type: "image/jpeg".to_string(),
    };
    assert!(ok.validate().is_ok());

    let pdf = AvatarUploadRequest {
        file_type: "application/pdf".to_string(),
        ..ok.clone()
    };
    assert!(pdf.validate().is_err());

    let unnamed = AvatarUploadRequest {
        filename: " ".to_string(),
        ..ok
    };
    assert_eq!(unnamed.validate(), Err("filename is required"));
}

// --- Categories & Forums ---

#[test]
fn test_slugify() {
    assert_eq!(slugify("Fixed Income & Derivatives"), "fixed-income-derivatives");
    assert_eq!(slugify("  Ethics  "), "ethics");
    assert_eq!(slugify("Level II -- Equity"), "level-ii-equity");
    assert_eq!(slugify("!!!"), "");
}

#[test]
fn test_category_request_validation() {
    let ok = CategoryRequest {
        name: "Portfolio Management".to_string(),
        description: None,
    };
    assert!(ok.validate().is_ok());

    let symbols = CategoryRequest {
        name: "%%%".to_string(),
        description: None,
    };
    assert_eq!(symbols.validate(), Err("name must contain letters or digits"));

    let long_description = CategoryRequest {
        description: Some("d".repeat(2001)),
        ..ok
    };
    assert!(long_description.validate().is_err());
}

#[test]
fn test_forum_request_validation() {
    let create = CreateForumRequest {
        category_id: Uuid::new_v4(),
        title: "Mock exam review".to_string(),
        description: Some("Post your scores".to_string()),
    };
    assert!(create.validate().is_ok());

    let untitled = CreateForumRequest {
        title: String::new(),
        ..create
    };
    assert_eq!(untitled.validate(), Err("title is required"));

    assert!(UpdateForumRequest::default().validate().is_ok());
    let long_title = UpdateForumRequest {
        title: Some("t".repeat(201)),
        ..Default::default()
    };
    assert_eq!(long_title.validate(), Err("title must be <= 200 chars"));
}
