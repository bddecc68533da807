use crate::settings::{ConfigField, HudConfig};

pub const QUIT_ID: &str = "quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuEntry {
    Toggle {
        field: ConfigField,
        label: &'static str,
        checked: bool,
    },
    Separator,
    Quit,
}

/// What the tray menu should show for a given configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuModel {
    pub entries: Vec<MenuEntry>,
}

impl MenuModel {
    pub fn from_config(config: &HudConfig) -> Self {
        let mut entries: Vec<MenuEntry> = ConfigField::ALL
            .into_iter()
            .map(|field| MenuEntry::Toggle {
                field,
                label: label(field),
                checked: field.get(config),
            })
            .collect();
        entries.push(MenuEntry::Separator);
        entries.push(MenuEntry::Quit);
        Self { entries }
    }
}

pub fn label(field: ConfigField) -> &'static str {
    match field {
        ConfigField::ShowDynamic => "Dynamic HUD",
        ConfigField::ShowStatic => "Static HUD",
        ConfigField::ClickThrough => "Click Through",
    }
}

/// What a click on the item with `id` asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    Toggle(ConfigField),
    Quit,
}

impl MenuAction {
    pub fn from_id(id: &str) -> Option<Self> {
        if id == QUIT_ID {
            return Some(MenuAction::Quit);
        }
        ConfigField::from_key(id).map(MenuAction::Toggle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkboxes_mirror_the_record() {
        let config = HudConfig {
            show_dynamic: false,
            show_static: true,
            click_through: false,
        };
        let model = MenuModel::from_config(&config);

        assert_eq!(
            model.entries,
            vec![
                MenuEntry::Toggle {
                    field: ConfigField::ShowDynamic,
                    label: "Dynamic HUD",
                    checked: false,
                },
                MenuEntry::Toggle {
                    field: ConfigField::ShowStatic,
                    label: "Static HUD",
                    checked: true,
                },
                MenuEntry::Toggle {
                    field: ConfigField::ClickThrough,
                    label: "Click Through",
                    checked: false,
                },
                MenuEntry::Separator,
                MenuEntry::Quit,
            ]
        );
    }

    #[test]
    fn ids_map_back_to_actions() {
        assert_eq!(MenuAction::from_id("quit"), Some(MenuAction::Quit));
        assert_eq!(
            MenuAction::from_id("clickThrough"),
            Some(MenuAction::Toggle(ConfigField::ClickThrough))
        );
        assert_eq!(MenuAction::from_id("separator"), None);
    }
}
