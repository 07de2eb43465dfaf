//! Topology, automation and settings declarations

use ha_ast::{
    Area, Automation, BrokerSettings, Decorator, DecoratorArg, Device, Entity, EventsMode,
    EventsSettings, Program, Property, Settings, Site, WhenClause,
};

use crate::cursor::{Fail, PResult, Parser};

impl<'src> Parser<'src> {
    /// `site* automation*` through end of input
    pub(crate) fn program(&mut self) -> PResult<Program> {
        let mut sites = Vec::new();
        while let Some(site) = self.attempt(Self::site) {
            sites.push(site);
        }

        let mut automations = Vec::new();
        while let Some(automation) = self.attempt(Self::automation) {
            automations.push(automation);
        }

        self.end_of_input()?;
        Ok(Program { sites, automations })
    }

    /// Zero or more `@name(args)`
    fn decorators(&mut self) -> PResult<Vec<Decorator>> {
        let mut decorators = Vec::new();
        loop {
            self.skip_trivia();
            if self.peek() != Some('@') {
                return Ok(decorators);
            }
            decorators.push(self.decorator()?);
        }
    }

    fn decorator(&mut self) -> PResult<Decorator> {
        let start = self.start();
        self.symbol("@")?;
        let name = self.identifier()?;
        self.symbol("(")?;

        let mut args = Vec::new();
        if !self.eat(")") {
            loop {
                args.push(self.labeled("decorator argument", Self::decorator_arg)?);
                if !self.eat(",") {
                    self.symbol(")")?;
                    break;
                }
            }
        }

        Ok(Decorator {
            name,
            args,
            span: self.span_from(start),
        })
    }

    fn decorator_arg(&mut self) -> PResult<DecoratorArg> {
        if let Some(ident) = self.attempt(Self::identifier) {
            return Ok(DecoratorArg::Identifier(ident));
        }
        if let Some(s) = self.attempt(Self::string) {
            return Ok(DecoratorArg::String(s));
        }
        if let Some(d) = self.attempt(Self::duration) {
            return Ok(DecoratorArg::Duration(d));
        }
        self.integer().map(DecoratorArg::Integer)
    }

    /// `home|zone 'Name'? alias { settings? area* }`
    fn site(&mut self) -> PResult<Site> {
        let start = self.start();
        let decorators = self.decorators()?;
        self.keyword_any(&["home", "zone"])?;
        let display_name = self.attempt(Self::string).unwrap_or_default();
        let alias = self.identifier()?;
        self.symbol("{")?;
        let settings = self.optional_settings()?;

        let mut areas = Vec::new();
        while !self.eat("}") {
            areas.push(self.area()?);
        }

        Ok(Site {
            display_name,
            alias,
            decorators,
            settings,
            areas,
            span: self.span_from(start),
        })
    }

    /// `area|room 'Name' alias type? { settings? device* }`
    fn area(&mut self) -> PResult<Area> {
        let start = self.start();
        let decorators = self.decorators()?;
        self.keyword_any(&["area", "room"])?;
        let display_name = self.string()?;
        let alias = self.identifier()?;
        let area_type = self.type_tag();
        self.symbol("{")?;
        let settings = self.optional_settings()?;

        let mut devices = Vec::new();
        while !self.eat("}") {
            devices.push(self.device()?);
        }

        Ok(Area {
            display_name,
            alias,
            area_type,
            decorators,
            settings,
            devices,
            span: self.span_from(start),
        })
    }

    /// `device 'Name' alias type? { entities? }`
    fn device(&mut self) -> PResult<Device> {
        let start = self.start();
        let decorators = self.decorators()?;
        self.keyword("device")?;
        let display_name = self.string()?;
        let alias = self.identifier()?;
        let device_type = self.type_tag();
        self.symbol("{")?;

        let entities = if self.eat_keyword("entities") {
            self.entity_list()?
        } else {
            Vec::new()
        };
        self.symbol("}")?;

        Ok(Device {
            display_name,
            alias,
            device_type,
            decorators,
            entities,
            span: self.span_from(start),
        })
    }

    /// Free-text type tag after an alias, an identifier or a string
    fn type_tag(&mut self) -> Option<String> {
        self.attempt(Self::identifier)
            .or_else(|| self.attempt(Self::string))
    }

    /// `: [ entity, ... ];` after the `entities` keyword
    fn entity_list(&mut self) -> PResult<Vec<Entity>> {
        self.symbol(":")?;
        self.symbol("[")?;

        let mut entities = Vec::new();
        loop {
            if self.eat("]") {
                break;
            }
            entities.push(self.entity()?);
            if !self.eat(",") {
                self.symbol("]")?;
                break;
            }
        }

        self.symbol(";")?;
        Ok(entities)
    }

    /// `type alias = expr (; key: expr)*` or `type alias { key: expr; ... }`
    fn entity(&mut self) -> PResult<Entity> {
        let start = self.start();
        let entity_type = self.identifier()?;
        let alias = self.identifier()?;
        let mut properties = Vec::new();

        if self.eat("=") {
            let id_start = self.start();
            let value = self.expression()?;
            properties.push(Property {
                key: "id".to_string(),
                value,
                span: self.span_from(id_start),
            });

            while let Some(extra) = self.attempt(|p| {
                p.symbol(";")?;
                p.property()
            }) {
                properties.push(extra);
            }
        } else {
            self.symbol("{")?;
            while !self.eat("}") {
                properties.push(self.property()?);
                self.symbol(";")?;
            }
        }

        Ok(Entity {
            entity_type,
            alias,
            properties,
            span: self.span_from(start),
        })
    }

    fn optional_settings(&mut self) -> PResult<Option<Settings>> {
        let start = self.start();
        if !self.eat_keyword("settings") {
            return Ok(None);
        }
        self.symbol("{")?;

        let mut events = None;
        while !self.eat("}") {
            self.keyword("events")?;
            events = Some(self.events_settings()?);
        }

        Ok(Some(Settings {
            events,
            span: self.span_from(start),
        }))
    }

    /// `events { mode: auto|websocket|rabbitmq; rabbitmq { key: expr; ... } }`
    fn events_settings(&mut self) -> PResult<EventsSettings> {
        self.symbol("{")?;
        let mut mode = EventsMode::default();
        let mut broker = None;

        while !self.eat("}") {
            if self.eat_keyword("mode") {
                self.symbol(":")?;
                let mode_start = self.start();
                let word = self.identifier()?;
                mode = match EventsMode::from_keyword(&word) {
                    Some(mode) => mode,
                    None => {
                        self.expect_at(mode_start, "`auto`, `websocket` or `rabbitmq`");
                        return Err(Fail);
                    }
                };
                self.symbol(";")?;
            } else {
                self.keyword("rabbitmq")?;
                self.symbol("{")?;
                let mut properties = Vec::new();
                while !self.eat("}") {
                    properties.push(self.property()?);
                    self.symbol(";")?;
                }
                self.eat(";");
                broker = Some(BrokerSettings { properties });
            }
        }

        Ok(EventsSettings { mode, broker })
    }

    /// `automation 'Name'? { when_clause+ }`
    fn automation(&mut self) -> PResult<Automation> {
        let start = self.start();
        let decorators = self.decorators()?;
        self.keyword("automation")?;
        let display_name = self.attempt(Self::string).unwrap_or_default();
        self.symbol("{")?;

        let mut when_clauses = vec![self.when_clause()?];
        while !self.eat("}") {
            when_clauses.push(self.when_clause()?);
        }

        Ok(Automation {
            display_name,
            decorators,
            when_clauses,
            span: self.span_from(start),
        })
    }

    fn when_clause(&mut self) -> PResult<WhenClause> {
        let start = self.start();
        let decorators = self.decorators()?;
        self.keyword("when")?;
        let condition = self.condition(true)?;
        let actions = self.action_block()?;

        Ok(WhenClause {
            decorators,
            condition,
            actions,
            span: self.span_from(start),
        })
    }
}
