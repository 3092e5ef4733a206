use anyhow::Error;
use teloxide::prelude::*;

use crate::{
    module_mgr::ModuleManager,
    types::{HandlerResult, TeloxideDispatcher},
};

async fn message_filter(msg: Message) -> bool {
    let from = msg
        .from()
        .map(|u| {
            let full_name = u.full_name();
            if full_name.is_empty() {
                u.id.to_string()
            } else {
                full_name
            }
        })
        .unwrap_or("<unknown>".to_owned());

    if let Some(text) = msg.text() {
        info!("{} sent a message in chat {}: {}", from, msg.chat.id, text);
    } else {
        debug!("{} sent a non-text message in chat {}", from, msg.chat.id);
    }

    true
}

async fn default_handler(msg: Message) -> HandlerResult {
    debug!("Message ({}) is not handled!", msg.id);
    Ok(())
}

pub(crate) async fn build_dispatcher(
    bot: Bot,
    mut module_mgr: ModuleManager,
) -> Result<TeloxideDispatcher, Error> {
    // Load dependencies.
    let mut dep_map = DependencyMap::new();
    module_mgr.register_dependencies(&mut dep_map).await?;

    // Build handler chain.
    let mut biz_handler = dptree::entry();
    module_mgr.with_all_modules(|m| {
        biz_handler = biz_handler.clone().branch(m.handler_chain());
    });
    let handler = Update::filter_message()
        .chain(dptree::filter_async(message_filter))
        .chain(biz_handler.branch(dptree::endpoint(default_handler)));

    Ok(Dispatcher::builder(bot, handler)
        .dependencies(dep_map)
        .enable_ctrlc_handler()
        .build())
}
